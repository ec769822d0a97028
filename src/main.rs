use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use appeals_triage::{
    init_tracing, project, render_category_cards, render_upload_table, AppConfig,
    DashboardSession, FileAttachment, Plan, PLAN_CATEGORIES,
};

#[derive(Parser)]
#[command(name = "appeals-triage")]
#[command(about = "Municipal appeals triage dashboard")]
#[command(version)]
struct Cli {
    /// Municipality id to scope the session to
    #[arg(short, long, global = true)]
    municipality: Option<i64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show analytics and generated plans for the selected municipality
    Dashboard,
    /// List the known municipalities
    Municipalities,
    /// List the plan categories offered for generation
    Categories,
    /// Upload appeal documents for unification
    Upload {
        /// Files to submit (xls/xlsx/csv/pdf/doc/docx)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate an action plan for a category
    Plan {
        /// Category label, e.g. "Дороги"
        category: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let session = DashboardSession::new(&config).context("failed to build backend client")?;

    match cli.municipality {
        Some(id) => session.select_municipality(id).await,
        None => session.refresh().await,
    }

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => print_dashboard(&session),
        Commands::Municipalities => {
            for municipality in session.snapshot().municipalities {
                println!("{:>3}  {}", municipality.id, municipality.name);
            }
        }
        Commands::Categories => {
            for category in PLAN_CATEGORIES {
                println!("{category}");
            }
        }
        Commands::Upload { files } => {
            let attachments = files
                .iter()
                .map(|path| {
                    FileAttachment::from_path(path)
                        .with_context(|| format!("failed to read {}", path.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            session.select_files(attachments);
            let result = session.upload().await?;
            let view = project(&session.snapshot());
            print!("{}", render_upload_table(&view.upload_rows));
            if let Some(link) = result.export_url {
                println!("Консолидированный экспорт: {link}");
            }
        }
        Commands::Plan { category } => {
            let plans = session.generate_plan(&category).await?;
            print_plans(&plans);
        }
    }

    Ok(())
}

fn print_dashboard(session: &DashboardSession) {
    let state = session.snapshot();
    let view = project(&state);
    let name = state
        .municipalities
        .iter()
        .find(|m| m.id == state.municipality_id)
        .map(|m| m.name.as_str())
        .unwrap_or("—");

    println!("Муниципалитет: {name}");
    if let Some(at) = state.analytics_refreshed_at {
        println!("Аналитика обновлена: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }

    if view.category_series.is_empty() {
        println!("Загрузите данные для аналитики.");
    } else {
        println!("\nОбращения по категориям:");
        for slice in &view.category_series {
            println!("  {} — {}", slice.name, slice.value);
        }
        println!("\nОбращения по датам:");
        for point in &view.date_series {
            println!("  {} — {}", point.date, point.count);
        }
        print!("\n{}", render_category_cards(&view.category_cards));
    }

    if view.plans.is_empty() {
        println!("\nПланов пока нет.");
    } else {
        println!("\nПланы действий:");
        print_plans(&view.plans);
    }

    if let Some(error) = &state.last_error {
        println!("\nОшибка: {error}");
    }
}

fn print_plans(plans: &[Plan]) {
    for plan in plans {
        println!(
            "{} • {} • {}",
            plan.category, plan.municipality_name, plan.created_at
        );
        println!("  {}", plan.summary);
        println!("  DOCX: {}  PDF: {}", plan.docx_url, plan.pdf_url);
    }
}
