use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dispatch::{AuditLog, DispatchRequest, NotificationDispatcher};
use gateway::clickatell::{ClickatellClient, Credentials};
use gateway::mock::MockGateway;
use gateway::SmsGateway;
use ordersms_core::descriptor::{DESCRIPTOR, TEST_FAILED, TEST_SUCCESS};
use ordersms_core::memory::InMemoryOrderStore;
use ordersms_core::order::{Order, OrderStore};

pub fn show(store: Option<u64>) -> Result<()> {
    use config::SettingField;

    let scoped = config::load(store)?;
    let effective = scoped.effective();
    let marker = |field| {
        if scoped.is_overridden(field) {
            " (store override)"
        } else {
            ""
        }
    };

    println!("{} ({})", DESCRIPTOR.friendly_name, DESCRIPTOR.system_name);
    if let Some(scope) = scoped.scope {
        println!("scope: store {scope}");
    }
    println!("enabled:      {}{}", effective.enabled, marker(SettingField::Enabled));
    println!("api id:       {}{}", effective.api_id, marker(SettingField::ApiId));
    println!("username:     {}{}", effective.username, marker(SettingField::Username));
    let password = if effective.password.is_empty() {
        "(unset)"
    } else {
        "********"
    };
    println!("password:     {}{}", password, marker(SettingField::Password));
    println!(
        "phone number: {}{}",
        effective.phone_number,
        marker(SettingField::PhoneNumber)
    );
    Ok(())
}

pub fn configure(store: Option<u64>, patch: config::SettingsOverride) -> Result<()> {
    match store {
        Some(scope) => {
            // absent flags keep the field's existing override state
            let mut overrides = config::load(Some(scope))?.overrides;
            overrides.merge(patch);
            config::store_overrides(scope, &overrides)?;
        }
        None => {
            let mut base = config::load(None)?.base;
            base.apply(&patch);
            config::store_base(&base)?;
        }
    }
    tracing::info!("Settings updated");
    Ok(())
}

fn build_gateway(
    mock: bool,
    settings: &config::SmsSettings,
    timeout: Duration,
) -> Result<Arc<dyn SmsGateway>> {
    if mock {
        tracing::info!("using mock SMS gateway");
        return Ok(MockGateway::new());
    }

    // A disabled config is skipped by dispatch before any gateway call, and
    // its credentials may be unset; never parse them in that state.
    if !settings.enabled {
        return Ok(MockGateway::new());
    }

    let api_id: u32 = settings
        .api_id
        .trim()
        .parse()
        .context("gateway api id must be numeric")?;
    let credentials = Credentials {
        api_id,
        username: settings.username.clone(),
        password: config::resolve_password(settings),
    };
    Ok(Arc::new(ClickatellClient::new(credentials, timeout)?))
}

pub async fn send_test(
    store: Option<u64>,
    mock: bool,
    timeout_secs: u64,
    message: String,
) -> Result<()> {
    let settings = config::load(store)?.effective();
    let gateway = build_gateway(mock, &settings, Duration::from_secs(timeout_secs))?;
    let dispatcher =
        NotificationDispatcher::new(gateway, InMemoryOrderStore::new(), AuditLog::default_path());

    let result = dispatcher
        .dispatch(DispatchRequest::test(message), &settings)
        .await?;

    if result.success {
        println!("{TEST_SUCCESS}");
    } else {
        println!("{TEST_FAILED}");
        if let Some(diagnostic) = result.diagnostic {
            println!("  {diagnostic}");
        }
        std::process::exit(1);
    }
    Ok(())
}

pub async fn order_placed(
    store: Option<u64>,
    mock: bool,
    timeout_secs: u64,
    id: u64,
    total: f64,
) -> Result<()> {
    let settings = config::load(store)?.effective();
    let gateway = build_gateway(mock, &settings, Duration::from_secs(timeout_secs))?;
    let orders = InMemoryOrderStore::new();
    orders
        .insert(Order {
            id,
            total,
            notes: Vec::new(),
        })
        .await;
    let dispatcher =
        NotificationDispatcher::new(gateway, orders.clone(), AuditLog::default_path());

    dispatch::events::on_order_placed(&dispatcher, &settings, id).await;

    if let Some(order) = orders.order_by_id(id).await? {
        for note in &order.notes {
            println!(
                "note: {} (customer visible: {})",
                note.text, note.display_to_customer
            );
        }
    }
    Ok(())
}
