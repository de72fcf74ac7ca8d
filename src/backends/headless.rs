// In-process notification surface. Records every request and logs it; used
// where no desktop notification service exists (servers, CI) and by tests.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::components::content::CategoryRegistration;
use crate::components::platform::{
    AuthorizationState, BoxFuture, DeliveryReceipt, DeliveryRequest, NotificationSurface,
};
use crate::components::{DeliveryError, DeliveryResult, NotificationCategory, NotificationId};

#[derive(Debug)]
pub struct HeadlessSurface {
    authorization: RwLock<AuthorizationState>,
    /// State reported once the user is asked
    grant_on_request: AuthorizationState,
    categories: RwLock<HashMap<NotificationCategory, CategoryRegistration>>,
    delivered: Mutex<Vec<DeliveryRequest>>,
    removed: Mutex<Vec<NotificationId>>,
    dismissed: Mutex<Vec<NotificationId>>,
    fail_deliveries: RwLock<Option<String>>,
    sequence: Mutex<u64>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    /// Surface that grants authorization when asked
    pub fn new() -> Self {
        Self::with_authorization(AuthorizationState::NotDetermined, AuthorizationState::Authorized)
    }

    pub fn authorized() -> Self {
        Self::with_authorization(AuthorizationState::Authorized, AuthorizationState::Authorized)
    }

    /// Surface whose user declines the permission prompt
    pub fn denied() -> Self {
        Self::with_authorization(AuthorizationState::NotDetermined, AuthorizationState::Denied)
    }

    pub fn with_authorization(
        initial: AuthorizationState,
        grant_on_request: AuthorizationState,
    ) -> Self {
        Self {
            authorization: RwLock::new(initial),
            grant_on_request,
            categories: RwLock::new(HashMap::new()),
            delivered: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
            fail_deliveries: RwLock::new(None),
            sequence: Mutex::new(0),
        }
    }

    /// Make subsequent deliveries fail with `message` (`None` restores delivery)
    pub fn set_failure(&self, message: Option<String>) {
        *self.fail_deliveries.write() = message;
    }

    pub fn delivered(&self) -> Vec<DeliveryRequest> {
        self.delivered.lock().clone()
    }

    pub fn removed(&self) -> Vec<NotificationId> {
        self.removed.lock().clone()
    }

    /// Notifications the user responded to
    pub fn dismissed_ids(&self) -> Vec<NotificationId> {
        self.dismissed.lock().clone()
    }

    pub fn registered_category(&self, category: NotificationCategory) -> Option<CategoryRegistration> {
        self.categories.read().get(&category).cloned()
    }
}

impl NotificationSurface for HeadlessSurface {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn register_categories<'a>(
        &'a self,
        categories: &'a [CategoryRegistration],
    ) -> BoxFuture<'a, DeliveryResult<()>> {
        Box::pin(async move {
            let mut registered = self.categories.write();
            for registration in categories {
                registered.insert(registration.category, registration.clone());
            }
            tracing::debug!(count = categories.len(), "categories registered");
            Ok(())
        })
    }

    fn authorization_state(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>> {
        Box::pin(async move { Ok(*self.authorization.read()) })
    }

    fn request_authorization(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>> {
        Box::pin(async move {
            let mut authorization = self.authorization.write();
            if authorization.can_request() {
                *authorization = self.grant_on_request;
            }
            Ok(*authorization)
        })
    }

    fn deliver<'a>(
        &'a self,
        request: &'a DeliveryRequest,
    ) -> BoxFuture<'a, DeliveryResult<DeliveryReceipt>> {
        Box::pin(async move {
            if let Some(message) = self.fail_deliveries.read().clone() {
                return Err(DeliveryError::Surface {
                    surface: self.name().to_string(),
                    message,
                });
            }

            let native_id = {
                let mut sequence = self.sequence.lock();
                *sequence += 1;
                *sequence
            };

            tracing::info!(
                notification = %request.notification_id,
                category = %request.content.category,
                title = %request.content.title,
                presentation = ?request.presentation,
                "notification presented"
            );
            self.delivered.lock().push(request.clone());

            Ok(DeliveryReceipt::new(
                request.notification_id,
                self.name(),
                native_id.to_string(),
            ))
        })
    }

    fn remove<'a>(&'a self, ids: &'a [NotificationId]) -> BoxFuture<'a, DeliveryResult<()>> {
        Box::pin(async move {
            self.removed.lock().extend_from_slice(ids);
            Ok(())
        })
    }

    fn dismissed(&self, id: NotificationId) {
        self.dismissed.lock().push(id);
    }
}
