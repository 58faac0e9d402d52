use crate::ai::{CompletionBackend, ProviderClient};
use crate::config::{AppConfig, Credential};
use crate::context::web_search_provider;
use crate::session::Session;
use crate::views::ChatView;
use dioxus::prelude::*;
use std::sync::Arc;

const APP_CSS: &str = r#"
:root { font-family: system-ui, sans-serif; background: #0b0b0b; color: #f2f2f2; }
.header { padding: 0.75rem 1rem; border-bottom: 1px solid #222; }
.main-container { display: flex; flex-direction: column; height: calc(100vh - 4rem); }
.toolbar { display: flex; gap: 1rem; align-items: center; padding: 0.5rem 1rem; flex-wrap: wrap; }
.chat-wrap { flex: 1; overflow-y: auto; padding: 1rem; }
.message-row { display: flex; gap: 0.5rem; margin-bottom: 0.75rem; }
.message-row.user { justify-content: flex-end; }
.avatar { width: 2rem; height: 2rem; border-radius: 50%; background: #333; display: flex; align-items: center; justify-content: center; }
.bubble { padding: 0.5rem 0.75rem; border-radius: 0.5rem; max-width: 70ch; }
.bubble.user { background: #f2f2f2; color: #000; }
.bubble.assistant { background: #151515; }
.message-author { font-size: 0.8rem; opacity: 0.7; }
.warning { margin: 0 1rem; color: #f0b429; font-size: 0.85rem; }
.text-muted { opacity: 0.7; font-size: 0.85rem; }
.composer { padding: 0.75rem 1rem; border-top: 1px solid #222; }
.composer textarea { flex: 1; }
.error { color: #ff6b6b; }
"#;

#[component]
pub fn App() -> Element {
    let config = use_signal(AppConfig::from_env);

    let content = match &*config.read() {
        Err(err) => rsx! {
            div { class: "main-container",
                p { class: "error", "Configuration error: {err}" }
            }
        },
        Ok(cfg) if !cfg.has_credential() => rsx! {
            CredentialGate { config }
        },
        Ok(cfg) => {
            let cfg = cfg.clone();
            rsx! {
                SessionScreen { config: cfg }
            }
        }
    };

    let title = match &*config.read() {
        Ok(cfg) => cfg.variant.title(),
        Err(_) => "DoubleAgent",
    };

    rsx! {
        style { dangerous_inner_html: "{APP_CSS}" }
        div { class: "header no-divider",
            h1 { "{title}" }
        }
        {content}
    }
}

/// Asks for the API key when none was configured. Nothing is sent until one is given.
#[component]
fn CredentialGate(config: Signal<Result<AppConfig, crate::config::ConfigError>>) -> Element {
    let mut key = use_signal(String::new);

    let submit = move || {
        let Some(credential) = Credential::new(key()) else {
            return;
        };
        let mut config = config;
        let updated = match &*config.read() {
            Ok(cfg) => cfg.clone().with_credential(credential),
            Err(_) => return,
        };
        config.set(Ok(updated));
    };

    rsx! {
        div { class: "main-container",
            p { class: "error", "API key missing. Enter a key to start the session." }
            div { class: "hstack", style: "gap: 0.5rem; padding: 1rem;",
                input {
                    r#type: "password",
                    placeholder: "gsk_…",
                    value: "{key}",
                    oninput: move |ev| key.set(ev.value()),
                    onkeydown: move |ev| {
                        if ev.key() == dioxus::events::Key::Enter {
                            submit();
                        }
                    },
                }
                button {
                    class: "btn btn-primary", r#type: "button",
                    disabled: key().trim().is_empty(),
                    onclick: move |_| submit(),
                    "Start"
                }
            }
        }
    }
}

/// Owns the session for as long as the screen is mounted.
#[component]
fn SessionScreen(config: AppConfig) -> Element {
    let backend = use_hook(|| match ProviderClient::from_config(&config) {
        Ok(client) => Ok(Arc::new(client) as Arc<dyn CompletionBackend>),
        Err(err) => Err(err.to_string()),
    });

    match backend {
        Ok(backend) => rsx! {
            SessionChat { config: config.clone(), backend: BackendHandle(backend) }
        },
        Err(err) => rsx! {
            div { class: "main-container",
                p { class: "error", "Could not start the completion client: {err}" }
            }
        },
    }
}

/// Backend wrapper so it can travel as a component prop.
#[derive(Clone)]
struct BackendHandle(Arc<dyn CompletionBackend>);

impl PartialEq for BackendHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[component]
fn SessionChat(config: AppConfig, backend: BackendHandle) -> Element {
    let session = use_signal(move || {
        let search = web_search_provider(config.search_credential().map(|k| k.expose()));
        Session::new(config.clone(), backend.0.clone(), Some(search))
    });

    rsx! {
        ChatView { session }
    }
}
