use crate::core::providers::ProviderDescriptor;

/// Print the model list a provider currently advertises.
///
/// For the local backend this is the last discovered (or seed) list; run the
/// chat and use /models to refresh it.
pub fn list_models(provider: &ProviderDescriptor, default_model: Option<&str>) {
    println!("Models for {}:", provider.display_name);
    for model in &provider.models {
        let marker = if Some(model.as_str()) == default_model {
            "*"
        } else {
            " "
        };
        println!("{marker} {model}");
    }
    if !provider.requires_model {
        println!("\n{} ignores model selection.", provider.display_name);
    }
}
