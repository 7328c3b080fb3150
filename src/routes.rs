use dioxus::prelude::*;

use crate::components::leads::LeadList;
use crate::AppLayout;

#[derive(Routable, Clone, PartialEq, Debug)]
#[rustfmt::skip]
pub enum Route {
    #[layout(AppLayout)]
        #[route("/")]
        Leads {},
    #[end_layout]

    #[route("/:..segments")]
    NotFound { segments: Vec<String> },
}

#[component]
fn Leads() -> Element {
    rsx! {
        div { class: "flex-1 bg-gray-50",
            LeadList {}
        }
    }
}

#[component]
fn NotFound(segments: Vec<String>) -> Element {
    let path = segments.join("/");

    rsx! {
        div { class: "min-h-screen flex flex-col items-center justify-center gap-4 text-gray-500",
            p { "Nothing at /{path}" }
            Link {
                to: Route::Leads {},
                class: "text-blue-600 hover:text-blue-700 font-medium",
                "Back to leads"
            }
        }
    }
}
