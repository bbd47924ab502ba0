use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phylotrack_lib::phylotrack_io::{load_from_file, snapshot_to_file};
use phylotrack_lib::{
    init_logging, DisplayCodec, ForestSummary, InfoCodec, LoadOptions, Systematics,
    SystematicsConfig, TaxonId, UrlCodec,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect phylogeny snapshots", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Column holding the taxon info values
    #[arg(long, global = true, default_value = "info")]
    info_col: String,

    /// Info values are percent-encoded
    #[arg(long, global = true)]
    url_encoded: bool,

    /// TOML file with retention settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Do not treat childless taxa as alive
    #[arg(long, global = true)]
    no_assume_leaves_extant: bool,

    /// Trust the total_offspring column instead of recomputing it
    #[arg(long, global = true)]
    keep_total_offspring: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print phylostatistics of a snapshot
    Stats {
        snapshot: PathBuf,
        /// Time used for evolutionary distinctiveness (defaults to the latest recorded time)
        #[arg(long)]
        time: Option<f64>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the partitions of a snapshot
    Status { snapshot: PathBuf },
    /// Print the lineage of one taxon
    Lineage { snapshot: PathBuf, id: u64 },
    /// Print the snapshot as a Graphviz digraph
    Dot { snapshot: PathBuf },
    /// Drop extinct history older than a threshold and write a new snapshot
    Prune {
        snapshot: PathBuf,
        threshold: f64,
        output: PathBuf,
    },
}

/// Codec chosen on the command line.
enum Codec {
    Display(DisplayCodec<String>),
    Url(UrlCodec<String>),
}

impl InfoCodec<String> for Codec {
    fn encode(&self, info: &String) -> String {
        match self {
            Codec::Display(c) => c.encode(info),
            Codec::Url(c) => c.encode(info),
        }
    }

    fn decode(&self, cell: &str) -> std::result::Result<String, String> {
        match self {
            Codec::Display(c) => c.decode(cell),
            Codec::Url(c) => c.decode(cell),
        }
    }
}

impl Args {
    fn codec(&self) -> Codec {
        if self.url_encoded {
            Codec::Url(UrlCodec::new())
        } else {
            Codec::Display(DisplayCodec::new())
        }
    }

    fn load(&self, path: &Path) -> Result<Systematics<String, String>> {
        let config = match &self.config {
            Some(file) => {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("reading {}", file.display()))?;
                SystematicsConfig::from_toml(&content)?
            }
            None => SystematicsConfig::default(),
        };
        let mut sys = Systematics::with_config(|info: &String| info.clone(), config)?;
        let options = LoadOptions {
            assume_leaves_extant: !self.no_assume_leaves_extant,
            adjust_total_offspring: !self.keep_total_offspring,
        };
        load_from_file(&mut sys, path, &self.info_col, &self.codec(), options)?;
        Ok(sys)
    }
}

/// Latest finite time recorded in the forest.
fn latest_time(sys: &Systematics<String, String>) -> f64 {
    sys.iter()
        .flat_map(|t| [t.origination_time(), t.destruction_time()])
        .filter(|t| t.is_finite())
        .fold(0.0, f64::max)
}

fn print_summary(summary: &ForestSummary) {
    println!("Active taxa:             {}", summary.num_active);
    println!("Ancestor taxa:           {}", summary.num_ancestors);
    println!("Outside taxa:            {}", summary.num_outside);
    println!("Roots:                   {}", summary.num_roots);
    println!("Living organisms:        {}", summary.total_orgs);
    println!("Max depth:               {}", summary.max_depth);
    println!("MRCA depth:              {}", summary.mrca_depth);
    println!("Shannon diversity:       {:.6}", summary.shannon_diversity);
    println!("Phylogenetic diversity:  {}", summary.phylogenetic_diversity);
    println!("Sackin index:            {}", summary.sackin_index);
    println!("Colless-like index:      {:.6}", summary.colless_like_index);
    println!("Mean pairwise distance:  {:.6}", summary.mean_pairwise_distance);
    println!("Average origin time:     {:.6}", summary.average_origin_time);
    let ed = &summary.evolutionary_distinctiveness;
    println!(
        "Distinctiveness:         mean {:.6} sum {:.6} variance {:.6}",
        ed.mean, ed.sum, ed.variance
    );
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    tracing::debug!(?args, "Parsed arguments");

    match &args.command {
        Command::Stats {
            snapshot,
            time,
            json,
        } => {
            let sys = args.load(snapshot)?;
            let time = time.unwrap_or_else(|| latest_time(&sys));
            let summary = ForestSummary::collect(sys.forest(), time);
            summary.log();
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Status { snapshot } => {
            let sys = args.load(snapshot)?;
            print!("{}", sys.status_report());
        }
        Command::Lineage { snapshot, id } => {
            let sys = args.load(snapshot)?;
            let id = TaxonId(*id);
            anyhow::ensure!(sys.contains(id), "taxon {id} is not in the snapshot");
            print!("{}", sys.lineage_report(id));
        }
        Command::Dot { snapshot } => {
            let sys = args.load(snapshot)?;
            print!("{}", sys.to_dot());
        }
        Command::Prune {
            snapshot,
            threshold,
            output,
        } => {
            let mut sys = args.load(snapshot)?;
            let removed = sys.remove_before(*threshold);
            let rows = snapshot_to_file(&sys, &args.codec(), output)?;
            println!(
                "Removed {removed} taxa; wrote {rows} rows to {}",
                output.display()
            );
        }
    }

    Ok(())
}
