use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::bucking::{BuckingResult, CrossCutSection, QualityType};
use crate::cube::{CubeLookup, SolutionCube};
use crate::models::Species;
use crate::pricelist::{LogPart, Pricelist, TimberPricelist};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn heading(output: &mut String, title: &str, width: usize) {
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(width)));
}

/// Format the headline figures of a bucking result as a string.
pub fn format_result_summary(result: &BuckingResult) -> String {
    let mut output = String::new();
    heading(&mut output, "Bucking Result", 50);
    output.push_str(&format!(
        "{}\n",
        format!(
            "{} | DBH {:.1} cm | height {:.1} m",
            result.species, result.dbh_cm, result.height_m
        )
        .dimmed()
    ));

    let mut table = new_table(vec!["Metric", "Value", "Unit"]);
    let rows: [(&str, String, &str); 9] = [
        ("Total value", format!("{:.2}", result.total_value), "SEK"),
        ("Stem volume", format!("{:.4}", result.vol_sk_ub), "m³"),
        ("Volume to 5 cm", format!("{:.4}", result.vol_fub_5cm), "m³"),
        ("Merchantable volume", format!("{:.4}", result.merchantable_volume()), "m³"),
        ("Top volume", format!("{:.4}", result.top_volume), "m³"),
        ("Top share", format!("{:.1}%", result.top_proportion * 100.0), ""),
        ("Last cut", format!("{:.1}%", result.last_cut_relative_height * 100.0), "of height"),
        ("High stump value", format!("{:.1}%", result.high_stump_value_proportion * 100.0), ""),
        ("Dead wood share", format!("{:.1}%", result.dead_wood_proportion * 100.0), ""),
    ];
    for (name, value, unit) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value), Cell::new(unit)]);
    }
    output.push_str(&format!("{table}\n"));

    let mut by_quality = new_table(vec!["Assortment", "Volume (m³)", "Sawlog price/m³"]);
    for q in QualityType::ALL {
        let volume = result.volume_of(q);
        if volume <= 0.0 {
            continue;
        }
        let price = result
            .timber_price_by_quality
            .get(q.index())
            .copied()
            .filter(|p| *p > 0.0)
            .map(|p| format!("{p:.1}"))
            .unwrap_or_default();
        by_quality.add_row(vec![
            Cell::new(q.to_string()),
            Cell::new(format!("{volume:.4}")),
            Cell::new(price),
        ]);
    }
    output.push_str(&format!("{by_quality}"));
    output
}

/// Print the result summary.
pub fn print_result_summary(result: &BuckingResult) {
    println!("{}", format_result_summary(result));
}

/// Format a cutting plan. Heights are metres above ground.
pub fn format_sections_table(sections: &[CrossCutSection], stump_height_m: f64) -> String {
    let mut output = String::new();
    heading(&mut output, "Cutting Plan", 70);

    if sections.is_empty() {
        output.push_str("  No sections saved.\n");
        return output;
    }

    let mut table = new_table(vec![
        "#", "From (m)", "To (m)", "Length (m)", "Top (cm)", "Volume (m³)", "Value", "Assortment",
    ]);
    for (i, s) in sections.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{:.1}", stump_height_m + s.start_point as f64 / 10.0)),
            Cell::new(format!("{:.1}", stump_height_m + s.end_point as f64 / 10.0)),
            Cell::new(format!("{:.1}", s.length_dm() as f64 / 10.0)),
            Cell::new(format!("{:.1}", s.top_diameter)),
            Cell::new(format!("{:.4}", s.volume)),
            Cell::new(format!("{:.2}", s.value)),
            Cell::new(s.quality.to_string()),
        ]);
    }
    output.push_str(&format!("{table}"));
    output
}

pub fn print_sections_table(sections: &[CrossCutSection], stump_height_m: f64) {
    println!("{}", format_sections_table(sections, stump_height_m));
}

/// Format the sawlog price table of one species.
pub fn format_price_table(species: &Species, prices: &TimberPricelist) -> String {
    let mut output = String::new();
    heading(&mut output, &format!("Sawlog Prices: {species}"), 50);
    output.push_str(&format!(
        "{}\n",
        format!("Prices per {}", prices.volume_type).dimmed()
    ));

    let mut table = new_table(vec!["Diameter class (cm)", "Butt", "Middle", "Top"]);
    for class in prices.diameter_classes() {
        let Some(p) = prices.price_for_diameter(class) else {
            continue;
        };
        let mut row = vec![Cell::new(class)];
        row.extend(
            LogPart::ALL
                .iter()
                .map(|part| Cell::new(format!("{:.0}", p.price_for_log_part(*part)))),
        );
        table.add_row(row);
    }
    output.push_str(&format!("{table}"));

    if !prices.quality_outcome.is_empty() {
        output.push_str(&format!("\n{}\n", "Quality outcome (share per grade)".dimmed()));
        let mut table = new_table(vec!["Log part", "Grade shares"]);
        for (part, shares) in &prices.quality_outcome {
            let shares: Vec<String> = shares.iter().map(|s| format!("{:.0}%", s * 100.0)).collect();
            table.add_row(vec![Cell::new(part), Cell::new(shares.join(" / "))]);
        }
        output.push_str(&format!("{table}"));
    }
    output
}

/// Format the settings shared by every species plus pulpwood prices.
pub fn format_common_table(pricelist: &Pricelist, hash: &str) -> String {
    let mut output = String::new();
    heading(&mut output, "Price List", 50);
    output.push_str(&format!("{}\n", format!("blake3 {hash}").dimmed()));

    let mut table = new_table(vec!["Setting", "Value"]);
    let rows = [
        ("Top diameter", format!("{:.1} cm", pricelist.top_diameter)),
        (
            "Sawlog length",
            format!("{:.1}-{:.1} m", pricelist.timber_log_length.min, pricelist.timber_log_length.max),
        ),
        (
            "Pulpwood length",
            format!("{:.1}-{:.1} m", pricelist.pulp_log_length.min, pricelist.pulp_log_length.max),
        ),
        (
            "Pulpwood diameter",
            format!("{:.1}-{:.1} cm", pricelist.pulp_log_diameter.min, pricelist.pulp_log_diameter.max),
        ),
        ("Log cull price", format!("{:.1}", pricelist.log_cull_price)),
        ("Fuelwood price", format!("{:.1}", pricelist.fuelwood_price)),
        ("High stump height", format!("{:.1} m", pricelist.high_stump_height)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    output.push_str(&format!("{table}\n"));

    let mut pulp: Vec<_> = pricelist.pulp.iter().collect();
    pulp.sort_by(|a, b| a.0.cmp(b.0));
    let mut pulp_table = new_table(vec!["Pulpwood", "Price/m³"]);
    for (species, price) in pulp {
        pulp_table.add_row(vec![Cell::new(species), Cell::new(format!("{price:.0}"))]);
    }
    output.push_str(&format!("{pulp_table}"));
    output
}

/// Format cube metadata and record counts.
pub fn format_cube_summary(cube: &SolutionCube) -> String {
    let mut output = String::new();
    heading(&mut output, "Solution Cube", 50);

    let failed = cube.records.iter().filter(|r| r.is_failed()).count();
    let mut table = new_table(vec!["Property", "Value"]);
    let rows = [
        ("Price list hash", cube.pricelist_hash.clone()),
        ("Taper model", cube.taper_model.to_string()),
        ("Created (UTC)", cube.created_utc.format("%Y-%m-%d %H:%M:%S").to_string()),
        ("Species", cube.species().join(", ")),
        (
            "DBH range",
            format!("{:.0}-{:.0} cm step {}", cube.grid.dbh_range.0, cube.grid.dbh_range.1, cube.grid.dbh_step),
        ),
        (
            "Height range",
            format!(
                "{:.1}-{:.1} m step {}",
                cube.grid.height_range.0, cube.grid.height_range.1, cube.grid.height_step
            ),
        ),
        ("Records", cube.len().to_string()),
        ("Failed", failed.to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    output.push_str(&format!("{table}"));
    output
}

pub fn print_cube_summary(cube: &SolutionCube) {
    println!("{}", format_cube_summary(cube));
}

/// Format one cube lookup with its cutting plan.
pub fn format_cube_lookup(species: &str, hit: &CubeLookup) -> String {
    let mut output = String::new();
    heading(&mut output, "Cube Lookup", 50);
    output.push_str(&format!(
        "  {species} at DBH {:.1} cm, height {:.1} m: value {}\n",
        hit.dbh,
        hit.height,
        if hit.total_value.is_nan() {
            "n/a".red().to_string()
        } else {
            format!("{:.2}", hit.total_value)
        }
    ));
    // Cube trees use the default stump height.
    let stump = crate::models::DEFAULT_STUMP_HEIGHT_RATIO * hit.height;
    output.push_str(&format_sections_table(&hit.sections, stump));
    output
}
