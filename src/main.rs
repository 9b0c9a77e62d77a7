use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use forest_bucking::{
    bucking::{BranchAndBoundBucker, TieBreak},
    config::AppConfig,
    cube::SolutionCube,
    models::{Species, Timber},
    pricelist::{content_hash, create_pricelist_from_data},
    taper::{Taper, TaperKind},
    visualization::{
        format_common_table, format_cube_lookup, format_price_table, print_cube_summary,
        print_result_summary, print_sections_table, print_stem_profile, print_volume_chart,
    },
};

#[derive(Parser)]
#[command(
    name = "forest-bucker",
    about = "Timber bucking optimizer - value-maximizing cross-cutting of standing trees",
    version,
    author
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the most valuable cutting plan for one tree
    Buck {
        /// Scientific species name, e.g. "pinus sylvestris"
        #[arg(short, long)]
        species: String,

        /// Diameter at breast height in cm
        #[arg(short, long)]
        dbh: f64,

        /// Total tree height in m
        #[arg(long)]
        height: f64,

        /// Stump height in m (default 1% of tree height)
        #[arg(long)]
        stump_height: Option<f64>,

        /// Taper model: edgren-nylinder-1949 or schmidt-2001
        #[arg(short, long)]
        taper: Option<TaperKind>,

        /// Apply quality downgrading
        #[arg(long)]
        downgrading: bool,

        /// Tie-break between equally valuable logs: shortest or longest
        #[arg(long)]
        tie_break: Option<TieBreak>,

        /// Leave the high stump standing
        #[arg(long)]
        leave_high_stump: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Precompute cutting plans over a DBH and height grid
    Cube {
        /// Output cube file (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Also export the records as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Species to include (repeatable)
        #[arg(short, long)]
        species: Vec<String>,

        #[arg(long)]
        dbh_min: Option<f64>,

        #[arg(long)]
        dbh_max: Option<f64>,

        #[arg(long)]
        dbh_step: Option<f64>,

        #[arg(long)]
        height_min: Option<f64>,

        #[arg(long)]
        height_max: Option<f64>,

        #[arg(long)]
        height_step: Option<f64>,

        /// Taper model: edgren-nylinder-1949 or schmidt-2001
        #[arg(short, long)]
        taper: Option<TaperKind>,
    },

    /// Look up the nearest precomputed tree in a cube
    Lookup {
        /// Cube file produced by `cube`
        #[arg(long)]
        cube: PathBuf,

        #[arg(short, long)]
        species: String,

        #[arg(short, long)]
        dbh: f64,

        #[arg(long)]
        height: f64,

        /// Fail unless the cube was built from the configured price list
        #[arg(long)]
        verify: bool,
    },

    /// Show the configured price list
    Pricelist {
        /// Only show this species
        #[arg(short, long)]
        species: Option<String>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Buck {
            species,
            dbh,
            height,
            stump_height,
            taper,
            downgrading,
            tie_break,
            leave_high_stump,
            json,
        } => {
            let data = config.price_data()?;
            let pricelist = create_pricelist_from_data(&data, None)?;

            let mut timber = Timber::new(species.as_str(), dbh, height)?;
            if let Some(stump) = stump_height {
                timber = timber.with_stump_height(stump);
                timber.validate()?;
            }
            let taper = Taper::new(taper.unwrap_or(config.taper), &timber)?;

            let mut bucking = config.bucking.clone().with_sections(true);
            if downgrading {
                bucking = bucking.with_downgrading(true);
            }
            if leave_high_stump {
                bucking = bucking.with_high_stump(true);
            }
            if let Some(tb) = tie_break {
                bucking = bucking.with_tie_break(tb);
            }

            let bucker = BranchAndBoundBucker::new(&timber, &pricelist, &taper)?;
            let result = bucker.calculate_tree_value(config.min_diam_dead_wood, &bucking)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result_summary(&result);
                print_sections_table(result.sections(), result.stump_height_m);
                print_stem_profile(&result);
                print_volume_chart(&result);
            }
        }

        Commands::Cube {
            output,
            csv,
            species,
            dbh_min,
            dbh_max,
            dbh_step,
            height_min,
            height_max,
            height_step,
            taper,
        } => {
            let data = config.price_data()?;
            let mut grid = config.cube.clone();
            if !species.is_empty() {
                grid.species = species;
            }
            grid.dbh_range = (
                dbh_min.unwrap_or(grid.dbh_range.0),
                dbh_max.unwrap_or(grid.dbh_range.1),
            );
            grid.dbh_step = dbh_step.unwrap_or(grid.dbh_step);
            grid.height_range = (
                height_min.unwrap_or(grid.height_range.0),
                height_max.unwrap_or(grid.height_range.1),
            );
            grid.height_step = height_step.unwrap_or(grid.height_step);
            grid.min_diam_dead_wood = config.min_diam_dead_wood;

            let cube = SolutionCube::generate(
                &data,
                taper.unwrap_or(config.taper),
                &grid,
                &config.bucking,
            )?;
            cube.save(&output)?;
            if let Some(csv_path) = &csv {
                cube.export_csv(csv_path)?;
            }

            print_cube_summary(&cube);
            println!(
                "{} Saved {} trees to {}",
                "Success:".green().bold(),
                cube.len(),
                output.display()
            );
        }

        Commands::Lookup {
            cube,
            species,
            dbh,
            height,
            verify,
        } => {
            let data = if verify {
                Some(config.price_data()?)
            } else {
                None
            };
            let solution = SolutionCube::load(&cube, data.as_ref())?;
            match solution.lookup(&species, dbh, height)? {
                Some(hit) => println!("{}", format_cube_lookup(&species, &hit)),
                None => anyhow::bail!("species '{species}' is not in the cube"),
            }
        }

        Commands::Pricelist { species } => {
            let data = config.price_data()?;
            let pricelist = create_pricelist_from_data(&data, None)?;
            println!("{}", format_common_table(&pricelist, &content_hash(&data)?));

            let wanted = species.as_deref().map(Species::new);
            for (sp, prices) in &pricelist.timber {
                if wanted.as_ref().is_some_and(|w| w != sp) {
                    continue;
                }
                println!("{}", format_price_table(sp, prices));
            }
        }
    }

    Ok(())
}
