use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use sous_core::controller::{Controller, Operation, Outcome};
use sous_core::generation::GenerationClient;
use sous_core::models::MealPlanDay;

use super::helpers::{report_outcome, truncate};

pub(crate) async fn cmd_plan_generate(
    ctrl: &mut Controller,
    client: &dyn GenerationClient,
    json: bool,
) -> Result<()> {
    if !json {
        eprintln!("Planning your week...");
    }
    let outcome = ctrl.generate_meal_plan(client).await?;
    report_outcome(ctrl, Operation::MealPlan, outcome, ctrl.meal_plan(), json)?;
    if !json && matches!(outcome, Outcome::Completed { .. }) {
        print_plan_table(ctrl.meal_plan());
    }
    Ok(())
}

pub(crate) fn cmd_plan_show(ctrl: &Controller, json: bool) -> Result<()> {
    let plan = ctrl.meal_plan();
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
    } else if plan.is_empty() {
        eprintln!("No meal plan yet. Use `sous plan generate` to create one.");
    } else {
        print_plan_table(plan);
    }
    Ok(())
}

fn print_plan_table(plan: &[MealPlanDay]) {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Breakfast")]
        breakfast: String,
        #[tabled(rename = "Lunch")]
        lunch: String,
        #[tabled(rename = "Dinner")]
        dinner: String,
        #[tabled(rename = "Snacks")]
        snacks: String,
    }

    let rows: Vec<DayRow> = plan
        .iter()
        .map(|d| DayRow {
            day: d.day.clone(),
            breakfast: truncate(&d.breakfast, 25),
            lunch: truncate(&d.lunch, 25),
            dinner: truncate(&d.dinner, 25),
            snacks: truncate(&d.snacks.join(", "), 25),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}
