use dioxus::prelude::*;
use crate::state::stats::LeadStats;

#[component]
pub fn StatsBar(stats: LeadStats) -> Element {
    rsx! {
        div { class: "grid grid-cols-4 gap-4",
            StatCard { label: "Leads", value: stats.total.to_string() }
            StatCard { label: "Success", value: stats.success.to_string() }
            StatCard { label: "WeChat added", value: stats.with_wechat.to_string() }
            StatCard { label: "Success rate", value: format!("{}%", stats.success_rate) }
        }
    }
}

#[component]
fn StatCard(label: String, value: String) -> Element {
    rsx! {
        div { class: "bg-white rounded-lg shadow-md p-4",
            p { class: "text-sm text-gray-500", "{label}" }
            p { class: "text-2xl font-semibold text-gray-900", "{value}" }
        }
    }
}
