use crate::ai::StreamHandle;
use crate::blueprint::{BLUEPRINT_FILE_NAME, default_download_dir, save_blueprint};
use crate::context::{Document, ExtractWarning};
use crate::personas::Mode;
use crate::session::Session;
use crate::types::{Role, Turn};
use crate::views::shared::{avatar_initial, copy_to_clipboard, markdown_to_html};
use dioxus::events::Key;
use dioxus::prelude::*;
use std::time::Duration;

const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(80);

fn role_class(role: &Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant | Role::Persona(_) => "assistant",
    }
}

fn pending_label(session: &Session, mode: &Mode) -> String {
    let names: Vec<&str> = mode
        .select(session.variant())
        .iter()
        .map(|p| p.name)
        .collect();
    format!("{} thinking…", names.join(" & "))
}

#[component]
pub fn ChatView(session: Signal<Session>) -> Element {
    let mut input = use_signal(String::new);
    let sending = use_signal(|| false);
    let mut documents = use_signal(Vec::<Document>::new);
    let warnings = use_signal(Vec::<ExtractWarning>::new);
    let mut exclusive = use_signal(|| false);
    let streaming_text = use_signal(|| Option::<String>::None);
    let blueprint_status = use_signal(|| Option::<String>::None);

    let variant = session.read().variant();

    let current_mode = move || match (exclusive(), variant.exclusive_persona()) {
        (true, Some(id)) => Mode::Exclusive(id.to_string()),
        _ => Mode::All,
    };

    let mut send_message = {
        let mut session = session;
        let mut sending_signal = sending;
        let mut input_signal = input;
        let mut warnings_signal = warnings;
        let mut streaming_signal = streaming_text;
        move |text: String| {
            let trimmed = text.trim().to_string();
            if trimmed.is_empty() || sending_signal() {
                return;
            }
            input_signal.set(String::new());
            sending_signal.set(true);

            let docs = documents();
            let mode = current_mode();
            let round = session.write().prepare_round(&trimmed, &docs, &mode);

            spawn(async move {
                let report = if variant.streams() {
                    streaming_signal.set(Some(String::new()));
                    round
                        .stream_with_updates(StreamHandle::new(), STREAM_POLL_INTERVAL, |content| {
                            streaming_signal.set(Some(content))
                        })
                        .await
                } else {
                    round.execute().await
                };

                session.write().commit(&report);
                warnings_signal.set(report.warnings);
                streaming_signal.set(None);
                sending_signal.set(false);
            });
        }
    };

    let on_upload = move |evt: FormEvent| async move {
        let Some(engine) = evt.files() else {
            return;
        };
        let mut loaded = Vec::new();
        for name in engine.files() {
            match engine.read_file(&name).await {
                Some(bytes) => loaded.push(Document::from_upload(name, bytes)),
                None => tracing::warn!(file = %name, "upload could not be read"),
            }
        }
        documents.set(loaded);
    };

    let on_blueprint = {
        let mut status = blueprint_status;
        move |_: MouseEvent| {
            let job = session.read().blueprint_task();
            status.set(Some("Compiling blueprint…".to_string()));
            spawn(async move {
                let report = job.await;
                let message = match save_blueprint(&report, &default_download_dir()) {
                    Ok(path) => format!("Blueprint saved to {}", path.display()),
                    Err(err) => format!("Could not save {BLUEPRINT_FILE_NAME}: {err}"),
                };
                status.set(Some(message));
            });
        }
    };

    let turns: Vec<Turn> = session.read().log().all().to_vec();
    let pending = if sending() && streaming_text().is_none() {
        Some(pending_label(&session.read(), &current_mode()))
    } else {
        None
    };
    let loaded_label = documents()
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let warning_list = warnings();

    rsx! {
        div { class: "main-container",
            div { class: "toolbar",
                if variant.accepts_documents() {
                    label { class: "upload",
                        "Documents "
                        input {
                            r#type: "file",
                            multiple: true,
                            accept: ".pdf,.txt,.md",
                            disabled: sending(),
                            onchange: on_upload,
                        }
                    }
                    if !loaded_label.is_empty() {
                        span { class: "text-muted", "Loaded: {loaded_label}" }
                    }
                }
                if variant.exclusive_persona().is_some() {
                    label { class: "mode-toggle",
                        input {
                            r#type: "checkbox",
                            checked: exclusive(),
                            disabled: sending(),
                            onchange: move |evt: FormEvent| exclusive.set(evt.value() == "true"),
                        }
                        " Exclusive audit mode"
                    }
                }
                if variant.supports_blueprint() {
                    button {
                        class: "btn", r#type: "button",
                        disabled: sending(),
                        onclick: on_blueprint,
                        "Compile blueprint"
                    }
                    if let Some(status) = blueprint_status() {
                        span { class: "text-muted", "{status}" }
                    }
                }
            }

            for warning in warning_list.iter() {
                div { class: "warning", "{warning}" }
            }

            div { class: "chat-wrap",
                div { id: "chat-list", class: "chat-list",
                    for (i, turn) in turns.iter().enumerate() {
                        TurnRow { key: "{i}", turn: turn.clone() }
                    }
                    if let Some(partial) = streaming_text() {
                        div { class: "message-row assistant",
                            div { class: "message-stack",
                                div { class: "bubble assistant",
                                    if partial.is_empty() {
                                        div { class: "shimmer-text", "Processing…" }
                                    } else {
                                        div { class: "md", dangerous_inner_html: "{markdown_to_html(&partial)}" }
                                    }
                                }
                            }
                        }
                    }
                    if let Some(label) = pending {
                        div { class: "shimmer-line",
                            span { class: "shimmer-text", "{label}" }
                        }
                    }
                }
            }

            form { class: "composer no-divider",
                div { class: "composer-inner",
                    div { class: "hstack", style: "gap: 0.5rem; width: 100%; align-items: flex-end;",
                        textarea {
                            rows: "1", placeholder: "Ask about today's news, your documents, or your next build…",
                            value: "{input}", oninput: move |ev| input.set(ev.value()),
                            onkeydown: move |ev| {
                                if ev.key() == Key::Enter && !ev.modifiers().shift() {
                                    ev.prevent_default();
                                    let text = input();
                                    send_message(text);
                                }
                            },
                            disabled: sending(), autofocus: true,
                        }
                        button {
                            class: "btn btn-primary", r#type: "button",
                            disabled: sending() || input().trim().is_empty(),
                            onclick: move |_| {
                                let text = input();
                                send_message(text);
                            },
                            "Send"
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn TurnRow(turn: Turn) -> Element {
    let class = role_class(&turn.role);
    let label = turn.role.label().to_string();
    let is_user = matches!(turn.role, Role::User);
    let content_html = markdown_to_html(&turn.content);
    let copy_payload = turn.content.clone();

    rsx! {
        div { class: "message-row {class}",
            if !is_user {
                div { class: "avatar assistant", title: "{label}", "{avatar_initial(&label)}" }
            }
            div { class: "message-stack",
                if !is_user {
                    div { class: "message-meta align-start",
                        span { class: "message-author", "{label}" }
                    }
                }
                div { class: "bubble {class}",
                    if is_user {
                        "{turn.content}"
                    } else {
                        div { class: "bubble-controls",
                            button {
                                class: "action-btn", title: "Copy markdown",
                                onclick: move |_| copy_to_clipboard(copy_payload.clone()),
                                "Copy"
                            }
                        }
                        div { class: "md", dangerous_inner_html: "{content_html}" }
                    }
                }
            }
        }
    }
}
