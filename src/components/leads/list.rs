use std::rc::Rc;

use dioxus::prelude::*;
use crate::error::LeadsError;
use crate::models::{Lead, LeadForm, SuccessFilter, WechatFilter};
use crate::components::common::{ErrorMessage, LoadingSpinner, ToastView};
use crate::components::leads::{DetailsEdit, LeadRow, NewLeadForm, StatsBar};
use crate::state::{DioxusSpawner, InvalidateAll, LeadsSession};
use crate::AppServices;

#[component]
pub fn LeadList() -> Element {
    let services = use_context::<AppServices>();
    let revision = use_signal(|| 0u64);
    let mut form = use_signal(LeadForm::default);
    let mut is_saving = use_signal(|| false);

    // One session per mounted view; dropping it discards late fetch results
    let session = use_hook(move || {
        LeadsSession::new(
            services.store.clone(),
            services.config.cache,
            services.config.toast_duration,
            Rc::new(DioxusSpawner),
            Rc::new(InvalidateAll),
        )
    });

    let subscription = use_hook({
        let session = session.clone();
        move || {
            session.subscribe(Rc::new(move || {
                let mut revision = revision;
                *revision.write() += 1;
            }))
        }
    });

    use_drop({
        let session = session.clone();
        move || session.unsubscribe(subscription)
    });

    // Fetch on mount
    use_effect({
        let session = session.clone();
        move || {
            session.filter.borrow().load();
        }
    });

    let _ = revision();
    let entry = session.visible();
    let stats = session.stats();
    let filter = session.filter.borrow().filter().clone();
    let fetch_error = session.filter.borrow().fetch_error();
    let toast = session.notifications.current();

    let on_search = {
        let session = session.clone();
        move |e: FormEvent| {
            session.filter.borrow_mut().set_search(e.value());
        }
    };
    let on_success_filter = {
        let session = session.clone();
        move |e: FormEvent| {
            session.filter.borrow_mut().set_success(SuccessFilter::from_value(&e.value()));
        }
    };
    let on_wechat_filter = {
        let session = session.clone();
        move |e: FormEvent| {
            session.filter.borrow_mut().set_wechat(WechatFilter::from_value(&e.value()));
        }
    };
    let on_intention_filter = {
        let session = session.clone();
        move |e: FormEvent| {
            let value = e.value();
            let level = (!value.trim().is_empty()).then_some(value);
            session.filter.borrow_mut().set_intention_level(level);
        }
    };
    let on_refresh = {
        let session = session.clone();
        move |_| session.filter.borrow().refresh()
    };
    let on_dismiss = {
        let session = session.clone();
        move |_| session.notifications.dismiss()
    };

    let on_submit = {
        let session = session.clone();
        move |_| {
            let session = session.clone();
            is_saving.set(true);
            spawn(async move {
                let mut draft = form();
                let result = session.mutations.create_lead(&mut draft).await;
                finish_submit(&mut form.write(), &result);
                is_saving.set(false);
            });
        }
    };

    let on_toggle_success = EventHandler::new({
        let session = session.clone();
        move |lead: Lead| {
            let session = session.clone();
            spawn(async move {
                if let Err(e) = session.mutations.toggle_success(&lead).await {
                    tracing::debug!("Success flag not changed: {}", e);
                }
            });
        }
    });
    let on_toggle_wechat = EventHandler::new({
        let session = session.clone();
        move |lead: Lead| {
            let session = session.clone();
            spawn(async move {
                if let Err(e) = session.mutations.toggle_wechat(&lead).await {
                    tracing::debug!("WeChat flag not changed: {}", e);
                }
            });
        }
    });
    let on_update_details = EventHandler::new({
        let session = session.clone();
        move |edit: DetailsEdit| {
            let session = session.clone();
            spawn(async move {
                let result = session
                    .mutations
                    .update_details(&edit.phone, &edit.intention_level, &edit.detail)
                    .await;
                if let Err(e) = result {
                    tracing::debug!("Details not updated: {}", e);
                }
            });
        }
    });
    let on_delete = EventHandler::new({
        let session = session.clone();
        move |phone: String| {
            let session = session.clone();
            spawn(async move {
                if let Err(e) = session.mutations.delete_lead(&phone).await {
                    tracing::debug!("Lead not deleted: {}", e);
                }
            });
        }
    });

    let is_loading = entry.as_ref().map(|e| e.is_loading()).unwrap_or(true);
    let is_refetching = entry.as_ref().is_some_and(|e| e.is_refetching());
    let leads: Vec<Lead> = entry
        .and_then(|e| e.data)
        .map(|page| page.items)
        .unwrap_or_default();
    let intention = filter.intention_level.clone().unwrap_or_default();

    rsx! {
        ToastView { toast: toast, on_dismiss: on_dismiss }

        div { class: "h-full flex flex-col gap-4 p-6 overflow-y-auto",
            // Header
            div { class: "flex items-center justify-between",
                h2 { class: "text-2xl font-semibold text-gray-900", "Leads" }
                div { class: "flex items-center gap-3",
                    if is_refetching {
                        span { class: "text-sm text-gray-400", "Refreshing..." }
                    }
                    button {
                        class: "px-3 py-1 text-sm border rounded hover:bg-gray-100",
                        onclick: on_refresh,
                        "Refresh"
                    }
                }
            }

            StatsBar { stats: stats }

            NewLeadForm {
                form: form,
                is_saving: is_saving(),
                on_submit: on_submit,
            }

            // Filters
            div { class: "flex flex-wrap gap-3 items-center",
                input {
                    class: "flex-1 min-w-48 px-3 py-2 border border-gray-300 rounded-lg focus:outline-none focus:ring-2 focus:ring-blue-500",
                    r#type: "search",
                    placeholder: "Search phone...",
                    value: "{filter.search}",
                    oninput: on_search,
                }
                select {
                    class: "px-3 py-2 border border-gray-300 rounded-lg",
                    value: "{filter.is_success.value()}",
                    onchange: on_success_filter,
                    for choice in [SuccessFilter::All, SuccessFilter::Success, SuccessFilter::Pending] {
                        option { value: "{choice.value()}", "Status: {choice.display_name()}" }
                    }
                }
                select {
                    class: "px-3 py-2 border border-gray-300 rounded-lg",
                    value: "{filter.has_wechat.value()}",
                    onchange: on_wechat_filter,
                    for choice in [WechatFilter::All, WechatFilter::True, WechatFilter::False] {
                        option { value: "{choice.value()}", "WeChat: {choice.display_name()}" }
                    }
                }
                input {
                    class: "w-40 px-3 py-2 border border-gray-300 rounded-lg",
                    placeholder: "Intention level",
                    value: "{intention}",
                    oninput: on_intention_filter,
                }
            }

            // Fetch failures show above whatever is still cached
            if let Some(err) = fetch_error {
                ErrorMessage { message: err.to_string() }
            }

            // Content
            if is_loading {
                LoadingSpinner {}
            } else if leads.is_empty() {
                div { class: "text-center text-gray-500 p-8",
                    if filter.search.is_empty() {
                        "No leads yet"
                    } else {
                        "No leads match your search"
                    }
                }
            } else {
                div { class: "bg-white rounded-lg shadow-md overflow-x-auto",
                    table { class: "w-full text-left",
                        thead { class: "bg-gray-50 text-xs uppercase text-gray-500",
                            tr {
                                th { class: "px-4 py-3", "Phone" }
                                th { class: "px-4 py-3", "Intention" }
                                th { class: "px-4 py-3", "Detail" }
                                th { class: "px-4 py-3", "Calls" }
                                th { class: "px-4 py-3", "Last call" }
                                th { class: "px-4 py-3", "Status" }
                                th { class: "px-4 py-3", "WeChat" }
                                th { class: "px-4 py-3", "Actions" }
                            }
                        }
                        tbody {
                            for lead in leads.iter() {
                                LeadRow {
                                    key: "{lead.phone}",
                                    lead: lead.clone(),
                                    on_toggle_success: on_toggle_success,
                                    on_toggle_wechat: on_toggle_wechat,
                                    on_update_details: on_update_details,
                                    on_delete: on_delete,
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Apply a create result to the live form. The insert ran on a snapshot, so
/// edits typed while it was in flight survive a failure.
fn finish_submit(live: &mut LeadForm, result: &Result<(), LeadsError>) {
    match result {
        Ok(()) => live.clear(),
        Err(e) => tracing::debug!("Lead not created: {}", e),
    }
}
