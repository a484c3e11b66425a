use std::sync::Arc;

use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::database::{Notification, PlacementStore, StoreError};
use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found or access denied")]
    NotFound,
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl NotificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::NotFound => ErrorKind::NotFound,
            NotificationError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for NotificationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotificationNotFound(_) => NotificationError::NotFound,
            other => NotificationError::Store(other),
        }
    }
}

/// Student-facing notification feed. Notifications are created elsewhere in
/// the platform; this surface lists them and flips read flags.
pub struct NotificationFeed<S> {
    store: Arc<S>,
}

impl<S: PlacementStore> NotificationFeed<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list(&self, student_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.store.notifications_for_student(student_id).await?)
    }

    /// Marks one notification read. Another student's notification reports
    /// not-found.
    pub async fn mark_read(
        &self,
        student_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        let updated = self
            .store
            .mark_notification_read(student_id, notification_id)
            .await?;
        Ok(updated)
    }

    /// Marks every unread notification read, returning how many changed.
    pub async fn mark_all_read(&self, student_id: Uuid) -> Result<u64, NotificationError> {
        let updated = self.store.mark_all_notifications_read(student_id).await?;
        info!(
            "Marked {} notifications read for student {}",
            updated, student_id
        );
        Ok(updated)
    }
}
