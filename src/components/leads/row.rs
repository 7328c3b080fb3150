use dioxus::prelude::*;
use crate::models::Lead;
use crate::components::common::Badge;

/// Edited free-text fields of one row: phone, intention level, detail.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsEdit {
    pub phone: String,
    pub intention_level: String,
    pub detail: String,
}

#[component]
pub fn LeadRow(
    lead: Lead,
    on_toggle_success: EventHandler<Lead>,
    on_toggle_wechat: EventHandler<Lead>,
    on_update_details: EventHandler<DetailsEdit>,
    on_delete: EventHandler<String>,
) -> Element {
    let mut editing = use_signal(|| None::<DetailsEdit>);
    let last_call = lead
        .latest_call_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Never".to_string());
    let connect_rate = lead
        .connect_rate()
        .map(|rate| format!("{}%", rate))
        .unwrap_or_else(|| "-".to_string());
    let detail = lead.detail.clone().unwrap_or_default();
    let wechat_label = if lead.has_wechat { "WeChat \u{2714}" } else { "No WeChat" };

    let toggle_success_lead = lead.clone();
    let toggle_wechat_lead = lead.clone();
    let phone = lead.phone.clone();
    let edit_start = DetailsEdit {
        phone: lead.phone.clone(),
        intention_level: lead.intention_level.clone().unwrap_or_default(),
        detail: detail.clone(),
    };

    rsx! {
        tr { class: "border-b hover:bg-gray-50",
            td { class: "px-4 py-3 font-mono", "{lead.phone}" }
            if let Some(draft) = editing() {
                td { class: "px-4 py-3",
                    input {
                        class: "w-24 px-2 py-1 border border-gray-300 rounded",
                        value: "{draft.intention_level}",
                        oninput: move |e| {
                            if let Some(d) = editing.write().as_mut() {
                                d.intention_level = e.value();
                            }
                        },
                    }
                }
                td { class: "px-4 py-3",
                    div { class: "flex gap-2",
                        input {
                            class: "flex-1 px-2 py-1 border border-gray-300 rounded",
                            value: "{draft.detail}",
                            oninput: move |e| {
                                if let Some(d) = editing.write().as_mut() {
                                    d.detail = e.value();
                                }
                            },
                        }
                        button {
                            class: "text-blue-600 hover:text-blue-800 text-sm",
                            onclick: move |_| {
                                if let Some(d) = editing.take() {
                                    on_update_details.call(d);
                                }
                            },
                            "Save"
                        }
                        button {
                            class: "text-gray-500 hover:text-gray-700 text-sm",
                            onclick: move |_| editing.set(None),
                            "Cancel"
                        }
                    }
                }
            } else {
                td { class: "px-4 py-3", "{lead.intention_label()}" }
                td { class: "px-4 py-3 text-sm text-gray-600 max-w-xs truncate", title: "{detail}", "{detail}" }
            }
            td { class: "px-4 py-3 text-sm",
                span { "{lead.call_summary()}" }
                span { class: "ml-2 text-gray-400", "{connect_rate}" }
            }
            td { class: "px-4 py-3 text-sm text-gray-600", "{last_call}" }
            td { class: "px-4 py-3",
                Badge {
                    text: lead.status_label().to_string(),
                    color_class: lead.status_color_class().to_string(),
                }
            }
            td { class: "px-4 py-3 text-sm", "{wechat_label}" }
            td { class: "px-4 py-3",
                div { class: "flex gap-2 text-sm",
                    button {
                        class: "text-blue-600 hover:text-blue-800",
                        onclick: move |_| on_toggle_success.call(toggle_success_lead.clone()),
                        if lead.is_success { "Unmark" } else { "Mark success" }
                    }
                    button {
                        class: "text-green-600 hover:text-green-800",
                        onclick: move |_| on_toggle_wechat.call(toggle_wechat_lead.clone()),
                        "Toggle WeChat"
                    }
                    button {
                        class: "text-gray-600 hover:text-gray-800",
                        onclick: move |_| editing.set(Some(edit_start.clone())),
                        "Edit"
                    }
                    button {
                        class: "text-red-600 hover:text-red-800",
                        onclick: move |_| on_delete.call(phone.clone()),
                        "Delete"
                    }
                }
            }
        }
    }
}
