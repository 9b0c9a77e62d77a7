use colored::Colorize;

use crate::bucking::{BuckingResult, QualityType};

const BAR_WIDTH: usize = 20;

/// Format the cutting plan as a stem drawn from stump to tip, one row per
/// log with a bar proportional to its top diameter.
pub fn format_stem_profile(result: &BuckingResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Stem Profile".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let sections = result.sections();
    if sections.is_empty() {
        output.push_str("  No sections saved.\n");
        return output;
    }

    output.push_str(&format!(
        "  {:>11}  {:>6}  {:<20}  {}\n",
        "Height (m)", "Top cm", "Diameter", "Assortment"
    ));
    output.push_str(&format!("  {}\n", "-".repeat(58)));

    let stump = result.stump_height_m;
    let mut last = stump;
    for s in sections {
        let from = stump + s.start_point as f64 / 10.0;
        let to = stump + s.end_point as f64 / 10.0;
        let bar_len = if result.diameter_stump_cm > 0.0 {
            ((s.top_diameter / result.diameter_stump_cm) * BAR_WIDTH as f64)
                .round()
                .clamp(0.0, BAR_WIDTH as f64) as usize
        } else {
            0
        };
        output.push_str(&format!(
            "  {:>5.1}-{:<5.1}  {:>6.1}  {:<20}  {}\n",
            from,
            to,
            s.top_diameter,
            "\u{2588}".repeat(bar_len),
            s.quality
        ));
        last = to;
    }
    if result.height_m - last > 0.05 {
        output.push_str(&format!(
            "  {:>5.1}-{:<5.1}  {:>6}  {:<20}  {}\n",
            last, result.height_m, "", "", "Top"
        ));
    }
    output
}

pub fn print_stem_profile(result: &BuckingResult) {
    print!("{}", format_stem_profile(result));
}

/// Format a bar chart of volume per assortment.
pub fn format_volume_chart(result: &BuckingResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Volume by Assortment".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let max_volume = result.volume_per_quality.iter().copied().fold(0.0f64, f64::max);
    if max_volume <= 0.0 {
        output.push_str("  No merchantable volume.\n");
        return output;
    }

    for q in QualityType::ALL {
        let volume = result.volume_of(q);
        if volume <= 0.0 {
            continue;
        }
        let bar_len = ((volume / max_volume) * 40.0).round() as usize;
        output.push_str(&format!(
            "  {:>10}  {:>7.4}  {}\n",
            q.to_string(),
            volume,
            "\u{2588}".repeat(bar_len).green()
        ));
    }
    output
}

pub fn print_volume_chart(result: &BuckingResult) {
    print!("{}", format_volume_chart(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucking::CrossCutSection;
    use crate::models::Species;

    fn section(start: u32, end: u32, top: f64, quality: QualityType) -> CrossCutSection {
        CrossCutSection {
            start_point: start,
            end_point: end,
            volume: 0.1,
            top_diameter: top,
            value: 10.0,
            species: Species::new("picea abies"),
            timber_proportion: 1.0,
            pulp_proportion: 0.0,
            cull_proportion: 0.0,
            fuelwood_proportion: 0.0,
            quality,
        }
    }

    fn result(sections: Option<Vec<CrossCutSection>>) -> BuckingResult {
        let mut volume = vec![0.0; QualityType::COUNT];
        volume[QualityType::ButtLog.index()] = 0.2;
        volume[QualityType::Pulp.index()] = 0.05;
        BuckingResult {
            species: Species::new("picea abies"),
            total_value: 60.0,
            top_proportion: 0.02,
            dead_wood_proportion: 0.0,
            high_stump_volume_proportion: 0.0,
            high_stump_value_proportion: 0.0,
            last_cut_relative_height: 0.72,
            volume_per_quality: volume,
            timber_price_by_quality: vec![0.0; QualityType::COUNT],
            top_volume: 0.005,
            high_stump_volume: 0.0,
            vol_fub_5cm: 0.25,
            vol_sk_ub: 0.26,
            dbh_cm: 18.0,
            height_m: 10.0,
            stump_height_m: 0.2,
            diameter_stump_cm: 20.0,
            taper_diams_cm: vec![],
            taper_heights_m: vec![],
            sections,
        }
    }

    #[test]
    fn test_stem_profile_snapshot() {
        colored::control::set_override(false);
        let r = result(Some(vec![
            section(0, 40, 16.0, QualityType::ButtLog),
            section(40, 70, 10.0, QualityType::Pulp),
        ]));
        insta::assert_snapshot!(format_stem_profile(&r).trim(), @r"
        Stem Profile
        ============================================================
           Height (m)  Top cm  Diameter              Assortment
          ----------------------------------------------------------
            0.2-4.2      16.0  ████████████████      Butt log
            4.2-7.2      10.0  ██████████            Pulp
            7.2-10.0                                 Top
        ");
    }

    #[test]
    fn test_stem_profile_without_sections() {
        let output = format_stem_profile(&result(None));
        assert!(output.contains("No sections saved."));
    }

    #[test]
    fn test_volume_chart() {
        let output = format_volume_chart(&result(None));
        assert!(output.contains("Butt log"));
        assert!(output.contains("0.2000"));
        assert!(output.contains("Pulp"));
        assert!(!output.contains("Fuelwood"));
    }

    #[test]
    fn test_volume_chart_empty() {
        let mut r = result(None);
        r.volume_per_quality = vec![0.0; QualityType::COUNT];
        assert!(format_volume_chart(&r).contains("No merchantable volume."));
    }
}
