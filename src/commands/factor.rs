use anyhow::{Result, anyhow};
use co2track::emission_factors::resolve_emission_factor;
use co2track::format::format_factor;

/// Print the factor that would be used for the given classification
pub fn handle_factor(
    type_code: Option<&str>,
    weight_class: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    match resolve_emission_factor(type_code, weight_class, category) {
        Some(factor) => {
            println!("{}", format_factor(&factor));
            Ok(())
        }
        None => Err(anyhow!(
            "No emission factor for type={} wtc={} category={}",
            type_code.unwrap_or("-"),
            weight_class.unwrap_or("-"),
            category.unwrap_or("-")
        )),
    }
}
