use std::io::Cursor;
use std::path::Path;

use google_drive3::{api::File, api::Scope, hyper_rustls, hyper_util, yup_oauth2, DriveHub};
use tokio::runtime::Runtime;

use super::store::SheetBackend;
use crate::workflows::pipeline::StoreError;

/// HTTPS connector used when the hub is built from a service-account key.
pub type DriveConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Store error for a failed Drive response status.
pub fn status_error(status: u16, detail: &str) -> StoreError {
    match status {
        429 => StoreError::RateLimited,
        404 => StoreError::Unavailable(format!("drive sheet not found: {detail}")),
        _ => StoreError::Unavailable(format!("drive returned {status}: {detail}")),
    }
}

/// Candidate sheet hosted on Google Drive, exchanged as `text/csv`.
///
/// The hub is built by the caller (credential loading lives outside this crate). Calls
/// block on a private runtime so the store stays synchronous.
pub struct DriveSheetBackend<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
    runtime: Runtime,
    file_id: String,
}

impl<C> DriveSheetBackend<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>, runtime: Runtime, file_id: impl Into<String>) -> Self {
        Self {
            hub,
            runtime,
            file_id: file_id.into(),
        }
    }

    pub fn with_runtime(hub: DriveHub<C>, file_id: impl Into<String>) -> Result<Self, StoreError> {
        let runtime = Runtime::new().map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self::new(hub, runtime, file_id))
    }

    fn map_error(err: google_drive3::Error) -> StoreError {
        match &err {
            google_drive3::Error::Failure(response) => {
                status_error(response.status().as_u16(), &err.to_string())
            }
            _ => StoreError::Unavailable(format!("drive: {err}")),
        }
    }
}

impl DriveSheetBackend<DriveConnector> {
    /// Hub authenticated with a service-account key file. The account needs edit
    /// access to the sheet.
    pub fn from_service_account(
        key_path: &Path,
        file_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let runtime = Runtime::new().map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let hub = runtime.block_on(async {
            let key = yup_oauth2::read_service_account_key(key_path)
                .await
                .map_err(|err| StoreError::Unavailable(format!("service account key: {err}")))?;
            let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
                .build()
                .await
                .map_err(|err| StoreError::Unavailable(format!("drive auth: {err}")))?;

            let connector = hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|err| StoreError::Unavailable(format!("tls roots: {err}")))?
                .https_or_http()
                .enable_http1()
                .build();
            let client = hyper_util::client::legacy::Client::builder(
                hyper_util::rt::TokioExecutor::new(),
            )
            .build(connector);

            Ok::<_, StoreError>(DriveHub::new(client, auth))
        })?;

        Ok(Self::new(hub, runtime, file_id))
    }
}

impl<C> std::fmt::Debug for DriveSheetBackend<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveSheetBackend")
            .field("file_id", &self.file_id)
            .finish_non_exhaustive()
    }
}

impl<C> SheetBackend for DriveSheetBackend<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        let bytes = self.runtime.block_on(async {
            let response = self
                .hub
                .files()
                .export(&self.file_id, "text/csv")
                .add_scope(Scope::Readonly)
                .doit()
                .await
                .map_err(Self::map_error)?;

            google_drive3::common::to_bytes(response.into_body())
                .await
                .ok_or_else(|| StoreError::Unavailable("drive export body unreadable".to_string()))
        })?;

        Ok(bytes.to_vec())
    }

    fn save(&self, csv: &[u8]) -> Result<(), StoreError> {
        let cursor = Cursor::new(csv.to_vec());

        let result = self.runtime.block_on(async {
            self.hub
                .files()
                .update(File::default(), &self.file_id)
                .supports_all_drives(true)
                .add_scope(Scope::Full)
                .upload(cursor, mime::TEXT_CSV)
                .await
        });

        result.map_err(Self::map_error)?;
        tracing::debug!(file_id = %self.file_id, bytes = csv.len(), "candidate sheet uploaded");
        Ok(())
    }
}
