//! Picks what to say when someone joins the channel.

use herald_types::Member;
use serde::Deserialize;

/// Placeholder replaced by the member's username in the welcome template.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

fn default_staff_message() -> String {
    "Ses kanalına bir yetkili veya kayıt sorumlusu girdi".to_string()
}

fn default_welcome_template() -> String {
    "{username} hoşgeldin sunucumuza lütfen kayıt yetkililerini bekle".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingConfig {
    /// Members with this role get `staff_message` instead of a welcome.
    #[serde(default)]
    pub staff_role_id: Option<u64>,

    #[serde(default = "default_staff_message")]
    pub staff_message: String,

    #[serde(default = "default_welcome_template")]
    pub welcome_template: String,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            staff_role_id: None,
            staff_message: default_staff_message(),
            welcome_template: default_welcome_template(),
        }
    }
}

impl GreetingConfig {
    pub fn is_staff(&self, member: &Member) -> bool {
        self.staff_role_id.is_some_and(|role| member.has_role(role))
    }

    /// The announcement for `member` joining the channel.
    pub fn greeting_for(&self, member: &Member) -> String {
        if self.is_staff(member) {
            self.staff_message.clone()
        } else {
            self.welcome_template
                .replace(USERNAME_PLACEHOLDER, &member.username)
        }
    }
}
