use crate::photo::is_image_key;
use anyhow::{Context, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use std::collections::HashMap;

/// A product (or bare product image) considered as a match for an outfit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_key: Option<String>,
    pub url: Option<String>,
    pub product_type: Option<String>,
}

impl Candidate {
    pub fn from_image_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            image_key: Some(key.clone()),
            id: key,
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn price_or_zero(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }
}

/// Parses a currency string such as `"$1,249.99"`. Anything unparseable is 0.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    match cleaned.trim().parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        _ => 0.0,
    }
}

/// A budget must be a finite, non-negative amount.
pub fn validate_budget(budget: f64) -> Result<f64> {
    anyhow::ensure!(
        budget.is_finite() && budget >= 0.0,
        "budget must be a finite, non-negative amount (got {budget})"
    );
    Ok(budget)
}

pub fn within_budget(candidates: Vec<Candidate>, budget: f64) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.price_or_zero() <= budget)
        .collect()
}

pub fn of_product_type(candidates: Vec<Candidate>, product_type: &str) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| {
            c.product_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(product_type))
        })
        .collect()
}

/// Source of candidate product images.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Image keys in listing order.
    async fn list_image_keys(&self) -> Result<Vec<String>>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// Source of priced product metadata.
#[async_trait::async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Every product, in scan order.
    async fn products(&self) -> Result<Vec<Candidate>>;
}

#[derive(Debug, Clone)]
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait::async_trait]
impl ImageStore for S3ImageStore {
    async fn list_image_keys(&self) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.with_context(|| format!("failed to list s3://{}", self.bucket))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| is_image_key(key))
                    .map(str::to_string),
            );
        }
        tracing::info!(bucket = %self.bucket, count = keys.len(), "listed candidate images");
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to get s3://{}/{key}", self.bucket))?;
        let bytes = object
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read s3://{}/{key}", self.bucket))?;
        Ok(bytes.into_bytes().to_vec())
    }
}

#[derive(Debug, Clone)]
pub struct DynamoCatalog {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoCatalog {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for DynamoCatalog {
    async fn products(&self) -> Result<Vec<Candidate>> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .with_context(|| format!("failed to scan table {}", self.table))?;

            items.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        tracing::info!(table = %self.table, count = items.len(), "scanned product table");
        Ok(items.iter().map(candidate_from_item).collect())
    }
}

fn attr_string(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    match item.get(name)? {
        AttributeValue::S(s) | AttributeValue::N(s) => Some(s.clone()),
        _ => None,
    }
}

/// Maps a product table item. Prices may be stored as strings or numbers.
pub fn candidate_from_item(item: &HashMap<String, AttributeValue>) -> Candidate {
    Candidate {
        id: attr_string(item, "product_id").unwrap_or_else(|| "unknown".to_string()),
        name: attr_string(item, "product_name"),
        description: attr_string(item, "description"),
        price: Some(attr_string(item, "price").map_or(0.0, |p| parse_price(&p))),
        image_key: attr_string(item, "s3_image_key"),
        url: attr_string(item, "product_url"),
        product_type: attr_string(item, "product_type"),
    }
}
