use dioxus::prelude::*;
use crate::models::LeadForm;
use crate::components::common::{Button, Input};

/// Creation form. The parent owns the draft and clears it once the insert
/// succeeds.
#[component]
pub fn NewLeadForm(form: Signal<LeadForm>, is_saving: bool, on_submit: EventHandler<()>) -> Element {
    let mut form = form;
    let draft = form();

    rsx! {
        div { class: "bg-white rounded-lg shadow-md p-4",
            h3 { class: "font-semibold mb-3", "New lead" }
            div { class: "grid grid-cols-3 gap-4",
                Input {
                    label: "Phone",
                    required: true,
                    value: draft.phone.clone(),
                    placeholder: "13800138000",
                    oninput: move |e: FormEvent| form.write().phone = e.value(),
                }
                Input {
                    label: "Intention level",
                    value: draft.intention_level.clone(),
                    placeholder: "A / B / C",
                    oninput: move |e: FormEvent| form.write().intention_level = e.value(),
                }
                Input {
                    label: "Detail",
                    value: draft.detail.clone(),
                    oninput: move |e: FormEvent| form.write().detail = e.value(),
                }
            }
            div { class: "flex justify-end",
                Button {
                    disabled: is_saving,
                    onclick: move |_| {
                        if !is_saving {
                            on_submit.call(());
                        }
                    },
                    if is_saving { "Saving..." } else { "Add lead" }
                }
            }
        }
    }
}
