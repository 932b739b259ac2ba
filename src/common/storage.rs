// src/common/storage.rs

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Armazenamento de arquivos (anexos, documentos do TFD).
/// As chaves são caminhos relativos como `tfd/{referralId}/{aleatório}.{ext}`.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
    /// Remover uma chave inexistente não é erro.
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Grava o arquivo e então executa `persist` (insert + commit do registro).
/// Se `persist` falhar, o arquivo é apagado para não ficar órfão no storage.
pub async fn store_then<T, F, Fut>(
    storage: &dyn BlobStorage,
    key: &str,
    bytes: &[u8],
    persist: F,
) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    storage.upload(key, bytes).await?;

    match persist().await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(cleanup) = storage.delete(key).await {
                tracing::warn!("Arquivo órfão {} não pôde ser removido: {}", key, cleanup);
            }
            Err(e)
        }
    }
}

/// Arquivo recebido via multipart, ainda não gravado.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Rejeita arquivo vazio ou acima do limite de upload.
    pub fn check_size(&self) -> Result<(), AppError> {
        if self.bytes.is_empty() {
            return Err(AppError::InvalidUpload("arquivo vazio".into()));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::InvalidUpload(format!(
                "arquivo maior que {} MB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

/// Gera a chave de armazenamento preservando a extensão do arquivo original.
pub fn storage_key(prefix: &str, owner_id: Uuid, file_name: &str) -> String {
    let random = Uuid::new_v4().simple();
    match extension_of(file_name) {
        Some(ext) => format!("{}/{}/{}.{}", prefix, owner_id, random, ext),
        None => format!("{}/{}/{}", prefix, owner_id, random),
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

/// Implementação em disco local.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(AppError::InvalidUpload(format!("chave inválida '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("📎 Arquivo salvo em {}", path.display());
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::ResourceNotFound(format!("Arquivo {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(len: usize) -> UploadedFile {
        UploadedFile {
            file_name: "foto.jpg".into(),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn upload_size_limits() {
        assert!(file(1).check_size().is_ok());
        assert!(file(MAX_UPLOAD_BYTES).check_size().is_ok());
        assert!(matches!(file(0).check_size(), Err(AppError::InvalidUpload(_))));
        assert!(matches!(
            file(MAX_UPLOAD_BYTES + 1).check_size(),
            Err(AppError::InvalidUpload(_))
        ));
    }

    #[test]
    fn key_keeps_prefix_owner_and_extension() {
        let owner = Uuid::new_v4();
        let key = storage_key("tfd", owner, "Laudo Médico.PDF");
        let prefix = format!("tfd/{}/", owner);
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with(".pdf"));
        assert_eq!(key.len(), prefix.len() + 32 + 4);
    }

    #[test]
    fn key_without_extension() {
        let owner = Uuid::new_v4();
        let key = storage_key("requests", owner, "README");
        assert!(!key.contains('.'));
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let key = storage_key("tfd", Uuid::new_v4(), "exame.jpg");

        storage.upload(&key, b"conteudo").await.unwrap();
        assert_eq!(storage.download(&key).await.unwrap(), b"conteudo");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let err = storage.download("tfd/x/nao-existe.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let err = storage.upload("../fora.txt", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn failed_persist_removes_the_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let key = storage_key("requests", Uuid::new_v4(), "foto.jpg");

        let result: Result<(), AppError> = store_then(&storage, &key, b"conteudo", || async {
            Err(AppError::ResourceNotFound("Solicitação".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::ResourceNotFound(_))));
        assert!(matches!(
            storage.download(&key).await,
            Err(AppError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn successful_persist_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let key = storage_key("tfd", Uuid::new_v4(), "laudo.pdf");

        let id = store_then(&storage, &key, b"pdf", || async { Ok(7) }).await.unwrap();

        assert_eq!(id, 7);
        assert_eq!(storage.download(&key).await.unwrap(), b"pdf");
    }
}
