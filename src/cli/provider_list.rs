use crate::core::providers::ProviderCatalog;

/// Print the provider catalog, marking which entries have a usable key.
pub fn list_providers(catalog: &ProviderCatalog, default_id: &str) {
    println!("Available providers:");
    for provider in catalog.providers() {
        let marker = if provider.id == default_id { "*" } else { " " };
        let auth = if provider.local {
            "local, no key needed"
        } else if provider.api_key.is_some() {
            "key configured"
        } else if provider.api_key_env.is_some() {
            "no key found"
        } else {
            "no key needed"
        };
        println!(
            "{marker} {:<10} {:<16} {} ({auth})",
            provider.id, provider.display_name, provider.base_url
        );
    }
    println!("\n* = default selection. Pick one with -p <provider>.");
}
