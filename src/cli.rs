use anyhow::{bail, Context as _, Result};
use chrono::{NaiveDate, Utc};
use console::{pad_str, style, Alignment, StyledObject};
use std::path::{Path, PathBuf};

use crate::args::{Args, Command, Via};
use crate::capture::capture;
use crate::classifier::{
    ApiKey, Classifier, GeminiClassifier, GeminiClient, GeminiRelay, OfflineClassifier,
    RelayClassifier,
};
use crate::config::{prompt_edit_config, Clock, Config};
use crate::contract::cues::{CATEGORIES, PAYMENT_METHODS, UNSPECIFIED_PAYMENT};
use crate::db::{
    Currency, JsonFileKvStore, LedgerStore, TransactionFields, TransactionRecord, TransactionType,
};
use crate::export;
use crate::reconcile::{parse_amount, parse_confidence, parse_date, RecordEdit};
use crate::relay_http_server::{self, RelayState};
use crate::terminal::{self, BulletPointPrinter};

const TYPES: [TransactionType; 3] = [
    TransactionType::Expense,
    TransactionType::Income,
    TransactionType::Unknown,
];
const CURRENCIES: [Currency; 3] = [Currency::Krw, Currency::Usd, Currency::Unknown];

pub async fn main(args: Args) -> Result<()> {
    let Args {
        config: config_path,
        api_key,
        today,
        command,
    } = args;
    let clock = Clock::from(today);
    let api_key = ApiKey::from_optional(api_key);
    match command {
        Command::Init => main_init(&config_path).await,
        Command::Config => main_edit_config(&config_path).await,
        Command::Serve => main_serve(&load_config(&config_path).await?, api_key, clock).await,
        Command::Add { text, via } => {
            Cli::load(&config_path, api_key, clock)
                .await?
                .main_add(&text.join(" "), via)
                .await
        }
        Command::AddManual => {
            Cli::load(&config_path, api_key, clock)
                .await?
                .main_add_manual()
                .await
        }
        Command::List => Cli::load(&config_path, api_key, clock).await?.main_list(),
        Command::Summary { top } => Cli::load(&config_path, api_key, clock)
            .await?
            .main_summary(top),
        Command::Edit { id } => {
            Cli::load(&config_path, api_key, clock)
                .await?
                .main_edit(&id)
                .await
        }
        Command::Export { output, csv, open } => Cli::load(&config_path, api_key, clock)
            .await?
            .main_export(output, csv, open),
    }
}

async fn load_config(path: &Path) -> Result<Config> {
    Config::load(path)
        .await
        .with_context(|| format!("Failed to load config from {path:?}"))
}

async fn main_init(config_path: &Path) -> Result<()> {
    if tokio::fs::try_exists(config_path).await? {
        bail!("Config file {config_path:?} already exists");
    }
    let config = Config::default();
    if tokio::fs::try_exists(&config.db_path).await? {
        bail!("Ledger {:?} already exists", config.db_path);
    }
    config
        .save(config_path)
        .await
        .context("Failed to write config")?;
    LedgerStore::open(JsonFileKvStore::new(&config.db_path))
        .await
        .save()
        .await
        .context("Failed to create ledger")?;

    println!("{}", style_header("Created:"));
    let printer = BulletPointPrinter::new_stdout();
    printer.print_field("config", config_path.display());
    printer.print_field("ledger", config.db_path.display());
    Ok(())
}

async fn main_edit_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;
    let config = prompt_edit_config(&config)?;
    config
        .save(config_path)
        .await
        .context("Failed to write config")?;
    println!("Saved {}", config_path.display());
    Ok(())
}

async fn main_serve(config: &Config, api_key: Option<ApiKey>, clock: Clock) -> Result<()> {
    if api_key.is_none() {
        log::warn!("GEMINI_API_KEY is not set, every request will be answered with an error");
    }
    let relay = GeminiRelay::new(api_key, GeminiClient::new(&config.api_base, &config.model));
    relay_http_server::serve(
        RelayState::new(relay, clock),
        config.listen_address,
        config.listen_port,
    )
    .await
}

pub struct Cli {
    config: Config,
    api_key: Option<ApiKey>,
    clock: Clock,
    store: LedgerStore<JsonFileKvStore>,
}

impl Cli {
    pub async fn load(config_path: &Path, api_key: Option<ApiKey>, clock: Clock) -> Result<Self> {
        let config = load_config(config_path).await?;
        let store = LedgerStore::open(JsonFileKvStore::new(&config.db_path)).await;
        Ok(Self {
            config,
            api_key,
            clock,
            store,
        })
    }

    fn classifier(&self, via: Via) -> Box<dyn Classifier> {
        match via {
            Via::Relay => Box::new(RelayClassifier::new(&self.config.relay_url)),
            Via::Gemini => Box::new(GeminiClassifier::new(GeminiRelay::new(
                self.api_key.clone(),
                GeminiClient::new(&self.config.api_base, &self.config.model),
            ))),
            Via::Offline => Box::new(OfflineClassifier),
        }
    }

    pub async fn main_add(&mut self, text: &str, via: Via) -> Result<()> {
        let classifier = self.classifier(via);
        let today = self.clock.today();
        let records = terminal::with_spinner(
            "Analyzing...",
            capture(text, classifier.as_ref(), &mut self.store, today, Utc::now()),
        )
        .await?;

        if records.is_empty() {
            println!("{}", style("No transactions found in the text").yellow());
            return Ok(());
        }
        println!("{}", style_header("Added:"));
        let printer = BulletPointPrinter::new_stdout();
        for record in &records {
            print_record(&printer, record);
        }
        Ok(())
    }

    pub async fn main_add_manual(&mut self) -> Result<()> {
        let initial = RecordEdit {
            date: self.clock.today().format("%Y-%m-%d").to_string(),
            currency: Currency::Krw.as_str().to_string(),
            payment_method: UNSPECIFIED_PAYMENT.to_string(),
            ..RecordEdit::default()
        };
        let fields = prompt_fields(initial)?;
        let record = TransactionRecord::manual(Utc::now(), fields);
        println!();
        println!("{}", style_header("Adding:"));
        print_record(&BulletPointPrinter::new_stdout(), &record);
        if !terminal::confirm("Save this transaction?")? {
            println!("Discarded");
            return Ok(());
        }
        self.store.append(record).await?;
        Ok(())
    }

    pub fn main_list(&self) -> Result<()> {
        println!("{}", style_header("Transactions:"));
        let ledger = self.store.ledger();
        if ledger.is_empty() {
            println!("(none)");
            return Ok(());
        }
        let printer = BulletPointPrinter::new_stdout();
        for record in ledger.records() {
            print_record(&printer, record);
        }
        Ok(())
    }

    pub fn main_summary(&self, top: usize) -> Result<()> {
        let ledger = self.store.ledger();
        let totals = ledger.totals();
        println!("{}", style_header("Totals:"));
        let printer = BulletPointPrinter::new_stdout();
        printer.print_field("income", style(totals.income).green());
        printer.print_field("expense", style(totals.expense).red());
        let balance = style(totals.balance).bold();
        printer.print_field(
            "balance",
            if totals.balance.is_sign_negative() {
                balance.red()
            } else {
                balance.green()
            },
        );

        println!();
        println!("{}", style_header("Top expense categories:"));
        let breakdown = ledger.category_breakdown(top);
        if breakdown.is_empty() {
            println!("(none)");
        }
        for total in breakdown {
            printer.print_field(&total.category, style(total.amount).red());
        }
        Ok(())
    }

    pub async fn main_edit(&mut self, id_prefix: &str) -> Result<()> {
        let matches: Vec<&TransactionRecord> =
            self.store.ledger().find_by_prefix(id_prefix).collect();
        let record = match matches.as_slice() {
            [record] => (*record).clone(),
            [] => bail!("No transaction with id {id_prefix}"),
            _ => bail!(
                "{} transactions match {id_prefix}, please give more of the id",
                matches.len()
            ),
        };

        println!("{}", style_header("Editing:"));
        print_record(&BulletPointPrinter::new_stdout(), &record);
        println!();
        let fields = prompt_fields(RecordEdit::from_record(&record))?;
        self.store.update(&record.id, fields).await?;
        if let Some(record) = self.store.ledger().get(&record.id) {
            println!();
            println!("{}", style_header("Saved:"));
            print_record(&BulletPointPrinter::new_stdout(), record);
        }
        Ok(())
    }

    pub fn main_export(&self, output: Option<PathBuf>, csv: bool, open: bool) -> Result<()> {
        let path = output
            .unwrap_or_else(|| PathBuf::from(export::default_file_name(self.clock.today(), csv)));
        let ledger = self.store.ledger();
        if csv {
            export::write_csv_file(ledger, &path)?;
        } else {
            export::write_xlsx(ledger, &path)?;
        }
        println!("Exported {} transactions to {}", ledger.len(), path.display());
        if open {
            open::that(&path).with_context(|| format!("Failed to open {path:?}"))?;
        }
        Ok(())
    }
}

/// Asks for every field, starting from `initial`. Input that does not parse is cleared.
fn prompt_fields(initial: RecordEdit) -> Result<TransactionFields> {
    let ty = TYPES[terminal::prompt_select(
        "Type",
        &TYPES.map(|ty| ty.as_str()),
        index_of(&TYPES.map(|ty| ty.as_str()), &initial.ty),
    )?];
    let amount = terminal::prompt_with_default("Amount", &initial.amount)?;
    warn_if_cleared("amount", &amount, parse_amount(&amount).is_some());
    let currency = CURRENCIES[terminal::prompt_select(
        "Currency",
        &CURRENCIES.map(|currency| currency.as_str()),
        index_of(&CURRENCIES.map(|currency| currency.as_str()), &initial.currency),
    )?];
    let category = terminal::prompt_with_default(
        &format!("Category ({})", CATEGORIES.join(", ")),
        &initial.category,
    )?;
    let merchant = terminal::prompt_with_default("Merchant", &initial.merchant)?;
    let date = terminal::prompt_with_default("Date (YYYY-MM-DD)", &initial.date)?;
    warn_if_cleared("date", &date, parse_date(&date).is_some());
    let memo = terminal::prompt_with_default("Memo", &initial.memo)?;
    let confidence = terminal::prompt_with_default("Confidence (0-1)", &initial.confidence)?;
    warn_if_cleared(
        "confidence",
        &confidence,
        parse_confidence(&confidence).is_some(),
    );
    let keywords = terminal::prompt_with_default("Keywords", &initial.keywords)?;
    let payment_method = terminal::prompt_with_default(
        &format!("Payment method ({})", PAYMENT_METHODS.join(", ")),
        &initial.payment_method,
    )?;
    let participants = terminal::prompt_with_default("Participants", &initial.participants)?;

    Ok(RecordEdit {
        ty: ty.as_str().to_string(),
        amount,
        currency: currency.as_str().to_string(),
        category,
        merchant,
        date,
        memo,
        confidence,
        keywords,
        payment_method,
        participants,
    }
    .into_fields())
}

fn index_of(items: &[&str], value: &str) -> usize {
    items.iter().position(|item| *item == value).unwrap_or(0)
}

fn warn_if_cleared(field: &str, input: &str, parsed: bool) {
    if !input.trim().is_empty() && !parsed {
        println!(
            "{}",
            style(format!("Could not read {field} {input:?}, it will be left empty")).yellow()
        );
    }
}

fn print_record(printer: &BulletPointPrinter, record: &TransactionRecord) {
    let fields = &record.fields;
    printer.print_item(format!(
        "{} {} {} {} {}{}",
        style_id(&record.id.short()),
        pad_str(
            &style_date(fields.date).to_string(),
            10,
            Alignment::Left,
            None
        ),
        pad_str(
            &style_amount(fields).to_string(),
            15,
            Alignment::Right,
            None
        ),
        style_category(&fields.category),
        style_merchant(&fields.merchant),
        style_memo(&fields.memo),
    ));

    let printer = printer.indent();
    if !record.original_text.is_empty() {
        printer.print_item(style_original_text(&record.original_text));
    }
    let factors = &fields.factors;
    if !factors.keywords.is_empty() {
        printer.print_field("keywords", factors.keywords.join(", "));
    }
    printer.print_field("payment", &factors.payment_method);
    if !factors.participants.is_empty() {
        printer.print_field("with", factors.participants.join(", "));
    }
    if let Some(confidence) = fields.confidence {
        printer.print_field("confidence", format!("{confidence:.2}"));
    }
}

fn style_header(header: &str) -> StyledObject<&str> {
    style(header).bold().underlined()
}

fn style_id(id: &str) -> StyledObject<&str> {
    style(id).dim()
}

fn style_date(date: Option<NaiveDate>) -> StyledObject<String> {
    style(
        date.map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "????-??-??".to_string()),
    )
}

fn style_amount(fields: &TransactionFields) -> StyledObject<String> {
    let amount = fields
        .amount
        .map(|amount| amount.normalize().to_string())
        .unwrap_or_else(|| "?".to_string());
    let result = style(format!("{} {}", amount, fields.currency.as_str())).bold();
    match fields.ty {
        TransactionType::Expense => result.red(),
        TransactionType::Income => result.green(),
        TransactionType::Unknown => result.yellow(),
    }
}

fn style_category(category: &str) -> StyledObject<String> {
    style(format!("[{category}]")).magenta()
}

fn style_merchant(merchant: &str) -> StyledObject<&str> {
    style(merchant).yellow()
}

fn style_memo(memo: &str) -> StyledObject<String> {
    let memo = if memo.is_empty() {
        String::new()
    } else {
        format!(" \"{memo}\"")
    };
    style(memo).blue()
}

fn style_original_text(text: &str) -> StyledObject<&str> {
    style(text).italic()
}
