use anyhow::Result;

use sous_core::controller::Controller;
use sous_core::models::{DietaryPreferences, PreferenceFlag};

use super::helpers::parse_switch;

fn print_preferences(prefs: &DietaryPreferences, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(prefs)?);
        return Ok(());
    }
    for flag in PreferenceFlag::ALL {
        let mark = if prefs.get(flag) { "x" } else { " " };
        println!("  [{mark}] {flag}");
    }
    if prefs.allergies.is_empty() {
        println!("  Allergies: none");
    } else {
        println!("  Allergies: {}", prefs.allergies.join(", "));
    }
    Ok(())
}

pub(crate) fn cmd_prefs_show(ctrl: &Controller, json: bool) -> Result<()> {
    print_preferences(ctrl.preferences(), json)
}

pub(crate) fn cmd_prefs_set(
    ctrl: &mut Controller,
    flag: &str,
    value: &str,
    json: bool,
) -> Result<()> {
    let flag: PreferenceFlag = flag.parse()?;
    let value = parse_switch(value)?;
    ctrl.set_preference(flag, value)?;
    print_preferences(ctrl.preferences(), json)
}

pub(crate) fn cmd_prefs_toggle(ctrl: &mut Controller, flag: &str, json: bool) -> Result<()> {
    let flag: PreferenceFlag = flag.parse()?;
    let value = ctrl.toggle_preference(flag)?;
    if json {
        println!("{}", serde_json::json!({ "flag": flag.as_str(), "value": value }));
    } else {
        println!("{flag}: {}", if value { "on" } else { "off" });
    }
    Ok(())
}

pub(crate) fn cmd_allergy_add(ctrl: &mut Controller, name: &str, json: bool) -> Result<()> {
    let added = ctrl.add_allergy(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ctrl.preferences().allergies)?);
    } else if added {
        println!("Added allergy {}", name.trim());
    } else {
        eprintln!("'{}' is already listed", name.trim());
    }
    Ok(())
}

pub(crate) fn cmd_allergy_remove(ctrl: &mut Controller, name: &str, json: bool) -> Result<()> {
    let removed = ctrl.remove_allergy(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ctrl.preferences().allergies)?);
    } else if removed {
        println!("Removed allergy {}", name.trim());
    } else {
        eprintln!("'{}' is not listed", name.trim());
    }
    Ok(())
}
