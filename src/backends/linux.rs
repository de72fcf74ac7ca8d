// Freedesktop notifications over the D-Bus session bus.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::OnceCell;
use zbus::Connection;
use zbus::zvariant::Value;

use crate::components::content::CategoryRegistration;
use crate::components::platform::{
    AuthorizationState, BoxFuture, DeliveryReceipt, DeliveryRequest, NotificationSurface,
};
use crate::components::policy::Presentation;
use crate::components::{ActionId, DeliveryError, DeliveryResult, NotificationCategory, NotificationId};

/// Action key the server reports when the notification body is clicked
const DEFAULT_ACTION_KEY: &str = "default";

#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications",
    gen_blocking = false
)]
trait Notifications {
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn get_capabilities(&self) -> zbus::Result<Vec<String>>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

#[derive(Clone)]
pub struct LinuxSurface {
    app_name: String,
    connection: Arc<OnceCell<Connection>>,
    capabilities: Arc<OnceCell<Vec<String>>>,
    categories: Arc<RwLock<HashMap<NotificationCategory, CategoryRegistration>>>,
    native_ids: Arc<DashMap<NotificationId, u32>>,
}

impl LinuxSurface {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            connection: Arc::new(OnceCell::new()),
            capabilities: Arc::new(OnceCell::new()),
            categories: Arc::new(RwLock::new(HashMap::new())),
            native_ids: Arc::new(DashMap::new()),
        }
    }

    /// Map a D-Bus id from an `ActionInvoked` signal back to our notification
    pub fn notification_for(&self, native_id: u32) -> Option<NotificationId> {
        self.native_ids
            .iter()
            .find(|entry| *entry.value() == native_id)
            .map(|entry| *entry.key())
    }

    /// Action id for an `ActionInvoked` action key
    pub fn action_for_key(action_key: &str) -> ActionId {
        match action_key {
            DEFAULT_ACTION_KEY => ActionId::default_action(),
            key => ActionId::new(key),
        }
    }

    async fn connection(&self) -> DeliveryResult<Connection> {
        self.connection
            .get_or_try_init(|| async {
                Connection::session()
                    .await
                    .map_err(|e| surface_error(format!("failed to connect to D-Bus session: {e}")))
            })
            .await
            .cloned()
    }

    async fn proxy(&self) -> DeliveryResult<NotificationsProxy<'static>> {
        let connection = self.connection().await?;
        NotificationsProxy::new(&connection)
            .await
            .map_err(|e| surface_error(format!("failed to create D-Bus proxy: {e}")))
    }

    async fn capabilities(&self) -> DeliveryResult<Vec<String>> {
        self.capabilities
            .get_or_try_init(|| async {
                self.proxy()
                    .await?
                    .get_capabilities()
                    .await
                    .map_err(|e| surface_error(format!("failed to get capabilities: {e}")))
            })
            .await
            .cloned()
    }

    fn hints(request: &DeliveryRequest) -> HashMap<&'static str, Value<'static>> {
        let presentation = request.presentation;
        let mut hints = HashMap::new();

        // Banner-less notifications go in at low urgency, calls at critical
        let urgency: u8 = match request.content.category {
            NotificationCategory::CallInvitation => 2,
            _ if !presentation.contains(Presentation::Banner) => 0,
            _ => 1,
        };
        hints.insert("urgency", Value::U8(urgency));
        hints.insert(
            "suppress-sound",
            Value::Bool(!presentation.contains(Presentation::Sound)),
        );
        hints.insert(
            "transient",
            Value::Bool(!presentation.contains(Presentation::List)),
        );
        hints.insert(
            "category",
            Value::from(freedesktop_category(request.content.category)),
        );
        hints
    }

    fn actions(&self, category: NotificationCategory) -> Vec<(String, String)> {
        let mut actions = vec![(DEFAULT_ACTION_KEY.to_string(), String::new())];
        if let Some(registration) = self.categories.read().get(&category) {
            actions.extend(
                registration
                    .actions
                    .iter()
                    .map(|action| (action.id.as_str().to_string(), action.title.clone())),
            );
        }
        actions
    }
}

impl NotificationSurface for LinuxSurface {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn register_categories<'a>(
        &'a self,
        categories: &'a [CategoryRegistration],
    ) -> BoxFuture<'a, DeliveryResult<()>> {
        Box::pin(async move {
            // Freedesktop has no category registry; actions are sent per notification
            let mut registered = self.categories.write();
            for registration in categories {
                registered.insert(registration.category, registration.clone());
            }
            Ok(())
        })
    }

    fn authorization_state(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>> {
        Box::pin(async move {
            // No permission model on D-Bus; an unreachable server counts as denied
            match self.connection().await {
                Ok(_) => Ok(AuthorizationState::Authorized),
                Err(error) => {
                    tracing::warn!(error = %error, "notification service unavailable");
                    Ok(AuthorizationState::Denied)
                },
            }
        })
    }

    fn request_authorization(&self) -> BoxFuture<'_, DeliveryResult<AuthorizationState>> {
        self.authorization_state()
    }

    fn deliver<'a>(
        &'a self,
        request: &'a DeliveryRequest,
    ) -> BoxFuture<'a, DeliveryResult<DeliveryReceipt>> {
        Box::pin(async move {
            let proxy = self.proxy().await?;
            let capabilities = self.capabilities().await.unwrap_or_default();

            let actions = if capabilities.iter().any(|cap| cap == "actions") {
                self.actions(request.content.category)
            } else {
                Vec::new()
            };
            let action_pairs: Vec<&str> = actions
                .iter()
                .flat_map(|(key, title)| [key.as_str(), title.as_str()])
                .collect();

            let body = if capabilities.iter().any(|cap| cap == "body-markup") {
                escape_markup(&request.content.body)
            } else {
                request.content.body.clone()
            };

            let native_id = proxy
                .notify(
                    &self.app_name,
                    0,
                    "",
                    &request.content.title,
                    &body,
                    action_pairs,
                    Self::hints(request),
                    -1,
                )
                .await
                .map_err(|e| surface_error(format!("failed to send notification: {e}")))?;

            self.native_ids.insert(request.notification_id, native_id);
            tracing::debug!(
                notification = %request.notification_id,
                native_id,
                "notification sent over D-Bus"
            );

            Ok(DeliveryReceipt::new(
                request.notification_id,
                self.name(),
                native_id.to_string(),
            ))
        })
    }

    fn remove<'a>(&'a self, ids: &'a [NotificationId]) -> BoxFuture<'a, DeliveryResult<()>> {
        Box::pin(async move {
            let proxy = self.proxy().await?;
            for id in ids {
                let Some((_, native_id)) = self.native_ids.remove(id) else {
                    continue;
                };
                proxy
                    .close_notification(native_id)
                    .await
                    .map_err(|e| surface_error(format!("failed to close notification: {e}")))?;
            }
            Ok(())
        })
    }

    fn dismissed(&self, id: NotificationId) {
        self.native_ids.remove(&id);
    }
}

fn surface_error(message: String) -> DeliveryError {
    DeliveryError::Surface {
        surface: "linux".to_string(),
        message,
    }
}

fn freedesktop_category(category: NotificationCategory) -> &'static str {
    match category {
        NotificationCategory::MessageReceived => "im.received",
        NotificationCategory::ContactRequest | NotificationCategory::ContactConnected => "presence",
        NotificationCategory::CallInvitation => "call.incoming",
        NotificationCategory::CheckMessage => "im",
    }
}

fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}
