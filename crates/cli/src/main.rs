use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use classifier::{ImageClassifier, Prediction};
use pipeline::normalize;
use server::{
    AppConfig, Credentials, ErrorBody, ErrorResponse, FoodOrchestrator, PredictError,
    ProviderKind, RecipeLookup, RecipeSet, assemble, assemble_predictions, assemble_recipes,
    build_provider, classify_image, load_classifier, lookup_recipes,
};

/// food-lens - identify a dish from a photo and suggest recipes for it
#[derive(Parser)]
#[command(name = "food-lens")]
#[command(about = "Classify a food photo and fetch recipes for the top labels", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ONNX classifier model (overrides the config file)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Class label table (overrides the config file)
    #[arg(long, global = true)]
    labels: Option<PathBuf>,

    /// Recipe provider (overrides the config file)
    #[arg(long, global = true, value_enum)]
    provider: Option<ProviderArg>,

    /// Print the JSON response instead of a listing
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, env = "FATSECRET_CLIENT_ID", hide_env_values = true, hide = true)]
    fatsecret_client_id: Option<String>,

    #[arg(long, env = "FATSECRET_CLIENT_SECRET", hide_env_values = true, hide = true)]
    fatsecret_client_secret: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, hide = true)]
    gemini_api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a photo and look up recipes for the top labels
    Predict {
        /// Image to classify
        #[arg(long)]
        image: PathBuf,

        /// Number of predictions to report
        #[arg(long)]
        top_k: Option<usize>,

        /// Number of top labels to look up recipes for
        #[arg(long)]
        lookup_labels: Option<usize>,

        /// Recipes to return per label
        #[arg(long)]
        recipes_per_label: Option<usize>,
    },

    /// Classify a photo without looking up recipes
    Classify {
        /// Image to classify
        #[arg(long)]
        image: PathBuf,

        /// Number of predictions to report
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Look up recipes for a dish name
    Recipes {
        /// Dish name, e.g. "apple_pie" or "pad thai"
        #[arg(long)]
        query: String,

        /// Maximum number of recipes
        #[arg(long)]
        max_results: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Fatsecret,
    Gemini,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Fatsecret => ProviderKind::FatSecret,
            ProviderArg::Gemini => ProviderKind::Gemini,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            print_failure(&startup_failure(&err), cli.json);
            return ExitCode::FAILURE;
        }
    };
    let expose_details = config.response.expose_error_details;

    match run(&cli, config).await {
        Ok(code) => code,
        Err(err) => {
            let response = match err.downcast_ref::<PredictError>() {
                Some(predict_err) => ErrorResponse::from_error(predict_err, expose_details),
                None => startup_failure(&err),
            };
            print_failure(&response, cli.json);
            ExitCode::FAILURE
        }
    }
}

/// Read the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(model) = &cli.model {
        config.model.model_path = model.clone();
    }
    if let Some(labels) = &cli.labels {
        config.model.labels_path = labels.clone();
    }
    if let Some(provider) = cli.provider {
        config.provider.kind = provider.into();
    }

    match &cli.command {
        Commands::Predict {
            top_k,
            lookup_labels,
            recipes_per_label,
            ..
        } => {
            if let Some(top_k) = top_k {
                config.pipeline.top_k = *top_k;
            }
            if let Some(lookup_labels) = lookup_labels {
                config.pipeline.lookup_labels = *lookup_labels;
            }
            if let Some(recipes_per_label) = recipes_per_label {
                config.pipeline.recipes_per_label = *recipes_per_label;
            }
        }
        Commands::Classify { top_k, .. } => {
            if let Some(top_k) = top_k {
                config.pipeline.top_k = *top_k;
            }
        }
        Commands::Recipes { max_results, .. } => {
            if let Some(max_results) = max_results {
                config.pipeline.recipes_per_label = *max_results;
            }
        }
    }

    config.validate().context("Invalid command-line options")?;
    Ok(config)
}

fn credentials(cli: &Cli) -> Credentials {
    Credentials {
        fatsecret_client_id: cli.fatsecret_client_id.clone(),
        fatsecret_client_secret: cli.fatsecret_client_secret.clone(),
        gemini_api_key: cli.gemini_api_key.clone(),
    }
}

async fn run(cli: &Cli, config: AppConfig) -> Result<ExitCode> {
    match &cli.command {
        Commands::Predict { image, .. } => handle_predict(cli, config, image).await,
        Commands::Classify { image, .. } => handle_classify(cli, config, image).await,
        Commands::Recipes { query, .. } => handle_recipes(cli, config, query).await,
    }
}

/// Handle the 'predict' command
async fn handle_predict(cli: &Cli, config: AppConfig, image: &Path) -> Result<ExitCode> {
    let classifier = load_classifier(&config.model).map_err(PredictError::from)?;
    let provider = build_provider(&config, &credentials(cli)).context("Failed to set up recipe provider")?;

    let orchestrator = FoodOrchestrator::new(Arc::new(classifier), provider, config.pipeline);

    let start = Instant::now();
    let response = orchestrator.handle_request(image).await?;

    if cli.json {
        println!("{}", assemble(&response).to_json(true)?);
    } else {
        print_predictions(&response.predictions);
        println!();
        print_recipes(&response.recipes);
        println!("{}", format!("Done in {:.2?}", start.elapsed()).dimmed());
    }

    // Per-label lookup failures are part of a successful response
    Ok(ExitCode::SUCCESS)
}

/// Handle the 'classify' command
async fn handle_classify(cli: &Cli, config: AppConfig, image: &Path) -> Result<ExitCode> {
    let classifier: Arc<dyn ImageClassifier> =
        Arc::new(load_classifier(&config.model).map_err(PredictError::from)?);

    let predictions = classify_image(
        classifier,
        image,
        config.pipeline.top_k,
        config.pipeline.request_deadline(),
    )
    .await?;

    if cli.json {
        println!("{}", assemble_predictions(&predictions).to_json(true)?);
    } else {
        print_predictions(&predictions);
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle the 'recipes' command
async fn handle_recipes(cli: &Cli, config: AppConfig, query: &str) -> Result<ExitCode> {
    let provider = build_provider(&config, &credentials(cli)).context("Failed to set up recipe provider")?;

    let query = normalize(query);
    let lookup = lookup_recipes(
        provider.as_ref(),
        &query,
        config.pipeline.recipes_per_label,
        config.pipeline.lookup_timeout(),
    )
    .await;
    let failed = lookup.is_failed();

    let mut recipes = RecipeSet::new();
    recipes.insert(query, lookup);

    if cli.json {
        println!("{}", assemble_recipes(&recipes).to_json(true)?);
    } else {
        print_recipes(&recipes);
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Failures outside a request (config, credentials) are shown in full.
fn startup_failure(err: &anyhow::Error) -> ErrorResponse {
    let message = format!("{:#}", err);
    error!(error = %message, "Startup failed");

    ErrorResponse {
        status: 500,
        body: ErrorBody { error: message },
    }
}

fn print_failure(response: &ErrorResponse, json: bool) {
    if json {
        match response.to_json() {
            Ok(body) => println!("{}", body),
            Err(_) => println!("{{\"error\":\"{}\"}}", response.status),
        }
    } else {
        eprintln!("{} {}", "Error:".red().bold(), response.body.error);
    }
}

fn print_predictions(predictions: &[Prediction]) {
    println!("{}", "Predictions:".bold().blue());
    for (rank, prediction) in predictions.iter().enumerate() {
        println!(
            "{}. {} ({:.1}%)",
            (rank + 1).to_string().green(),
            prediction.label,
            prediction.confidence * 100.0
        );
    }
}

fn print_recipes(recipes: &RecipeSet) {
    for (query, lookup) in recipes.iter() {
        match lookup {
            RecipeLookup::Found(found) if found.is_empty() => {
                println!("{} {}", format!("Recipes for '{}':", query).bold().blue(), "none found".dimmed());
            }
            RecipeLookup::Found(found) => {
                println!("{}", format!("Recipes for '{}':", query).bold().blue());
                for recipe in found {
                    println!("{} {}", "•".green(), recipe.name.bold());
                    println!("   Ingredients: {}", recipe.ingredients.join(", "));
                    for (step, instruction) in recipe.instructions.iter().enumerate() {
                        println!("   {}. {}", step + 1, instruction);
                    }
                }
            }
            RecipeLookup::Failed { error } => {
                println!("{} {}", format!("Recipes for '{}':", query).bold().blue(), error.red());
            }
        }
    }
}
