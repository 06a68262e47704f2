use chrono::Local;
use clap::Parser;
use nutriscan::adapters::client::{load_image_upload, DEFAULT_ENDPOINT};
use nutriscan::domain::ports::Storage;
use nutriscan::report::{default_report_filename, render_report, ReportDetails};
use nutriscan::utils::logger;
use nutriscan::utils::validation::Validate;
use nutriscan::{HttpPredictionClient, LocalStorage, Measurements, PredictionResponse, ScreeningSession};

#[derive(Parser)]
#[command(name = "medassess")]
#[command(about = "Submit a child's photo for malnutrition screening and export a PDF report")]
struct Args {
    /// Child's photo (jpg, jpeg or png)
    #[arg(short, long)]
    image: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[arg(long, default_value = "")]
    name: String,

    /// Male or Female
    #[arg(long)]
    gender: Option<String>,

    /// Age in years (0-5)
    #[arg(long)]
    age: Option<u32>,

    /// Height in cm (40-120)
    #[arg(long)]
    height: Option<f64>,

    /// Weight in kg (2-30)
    #[arg(long)]
    weight: Option<f64>,

    /// Write a PDF report into this directory
    #[arg(long)]
    report_dir: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn measurements(&self) -> Measurements {
        Measurements {
            sex: self.gender.clone(),
            age_years: self.age,
            height_cm: self.height,
            weight_kg: self.weight,
        }
    }

    fn report_details(&self) -> ReportDetails {
        ReportDetails {
            child_name: self.name.clone(),
            age_years: self.age,
            gender: self.gender.clone().unwrap_or_else(|| "N/A".to_string()),
            height_cm: self.height,
            weight_kg: self.weight,
            generated_at: Local::now(),
        }
    }
}

fn print_summary(response: &PredictionResponse) {
    println!("🧾 Prediction Summary");
    if let Some(error) = response.error() {
        println!("  Error: {}", error);
        return;
    }
    let na = || "N/A".to_string();
    println!(
        "  Image Prediction:   {}",
        response.image_prediction().map(|v| v.to_string()).unwrap_or_else(na)
    );
    println!(
        "  Numeric Prediction: {}",
        response.numeric_prediction().map(|v| v.to_string()).unwrap_or_else(na)
    );
    println!("  Advice:             {}", response.advice().unwrap_or("N/A"));
}

async fn run(args: &Args) -> nutriscan::Result<()> {
    // 先檢查數值範圍再上傳
    let measurements = args.measurements();
    measurements.validate()?;

    let upload = load_image_upload(&args.image).await?;
    let client = HttpPredictionClient::new(args.endpoint.clone())?;
    tracing::info!("📤 Submitting {} to {}", upload.filename, client.endpoint());
    let session = ScreeningSession::new(client);

    let biometrics = measurements.to_raw();
    let outcome = session.run(&upload, Some(&biometrics)).await?;

    print_summary(outcome.final_response());
    if outcome.needs_biometrics() {
        println!("⚠️ Please enter biometric data (--gender, --age, --height, --weight) for detailed analysis.");
    }

    if let Some(dir) = &args.report_dir {
        let details = args.report_details();
        let pdf = render_report(&details, outcome.final_response())?;
        let storage = LocalStorage::new(dir.clone());
        let path = storage
            .write_file(&default_report_filename(&details.generated_at), &pdf)
            .await?;
        tracing::info!("📥 Report saved ({} bytes)", pdf.len());
        println!("📥 PDF report written to {}", path);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = run(&args).await {
        tracing::error!("❌ Screening failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(2);
    }

    Ok(())
}
