mod app;
mod bridge;

use leptos::*;

fn main() {
    mount_to_body(|| view! { <app::App/> })
}
