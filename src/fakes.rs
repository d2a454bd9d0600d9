//! In-memory stand-ins for the model and AWS stores.

use crate::catalog::{Candidate, ImageStore, ProductCatalog};
use crate::model::{Prompt, VisionModel};
use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb([200, 180, 150]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Replies with canned responses in order and records every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl VisionModel for ScriptedModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
    }
}

pub struct MemoryImages {
    objects: Vec<(String, Vec<u8>)>,
}

impl MemoryImages {
    pub fn new<K: Into<String>>(objects: impl IntoIterator<Item = (K, Vec<u8>)>) -> Self {
        Self {
            objects: objects.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl ImageStore for MemoryImages {
    async fn list_image_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .objects
            .iter()
            .map(|(key, _)| key.clone())
            .filter(|key| crate::photo::is_image_key(key))
            .collect())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {key}"))
    }
}

pub struct MemoryCatalog {
    products: Vec<Candidate>,
}

impl MemoryCatalog {
    pub fn new(products: Vec<Candidate>) -> Self {
        Self { products }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn products(&self) -> Result<Vec<Candidate>> {
        Ok(self.products.clone())
    }
}

/// A catalog whose scan always fails with the given service error.
pub struct FailingCatalog(pub &'static str);

#[async_trait::async_trait]
impl ProductCatalog for FailingCatalog {
    async fn products(&self) -> Result<Vec<Candidate>> {
        Err(anyhow::anyhow!("{}", self.0))
    }
}
