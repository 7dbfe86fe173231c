use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::StoreError;
use crate::object::{ObjectStore, public_url};

/// Keeps uploaded objects in a map. Can be switched into a failing mode to exercise
/// upload error paths.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// While set, every `put_object` fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::ObjectStore(format!(
                "failed to upload {key}: store unavailable"
            )));
        }

        debug!("storing {} bytes under {key}", body.len());
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(public_url(&self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_returns_public_url() {
        let store = MemoryObjectStore::new("http://objects.local");
        let url = store.put_object("1_a.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(url, "http://objects.local/1_a.png");
        assert_eq!(store.get("1_a.png"), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn unavailable_store_rejects_uploads() {
        let store = MemoryObjectStore::new("http://objects.local");
        store.set_unavailable(true);

        let err = store.put_object("1_a.png", vec![1]).await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectStore(_)));
        assert!(store.is_empty());
    }
}
