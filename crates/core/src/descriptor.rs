//! Registration data handed to the host application. Install and uninstall
//! are the host's job; nothing here is executable lifecycle logic.

pub struct PluginDescriptor {
    pub system_name: &'static str,
    pub friendly_name: &'static str,
    pub version: &'static str,
}

pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    system_name: "Mobile.SMS.Clickatell",
    friendly_name: "Clickatell SMS provider",
    version: env!("CARGO_PKG_VERSION"),
};

/// Admin-facing outcome strings for the "send test message" action.
pub const TEST_SUCCESS: &str = "Test message was sent";
pub const TEST_FAILED: &str = "Test message sending failed";
