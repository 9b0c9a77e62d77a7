mod tables;
mod charts;

pub use tables::{
    format_result_summary, print_result_summary,
    format_sections_table, print_sections_table,
    format_price_table, format_common_table,
    format_cube_summary, print_cube_summary,
    format_cube_lookup,
};
pub use charts::{format_stem_profile, print_stem_profile, format_volume_chart, print_volume_chart};
