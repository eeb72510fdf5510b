use clap::{Args, Parser, Subcommand};
use engine::{Category, SettlementStatus, SplitPolicy};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "chipin")]
#[command(about = "Split shared expenses and settle up")]
pub struct Cli {
    /// Settings file (defaults to an optional `settings.toml`).
    #[arg(long)]
    pub config: Option<String>,

    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Email of the participant running the command.
    #[arg(long = "as", env = "CHIPIN_USER", value_name = "EMAIL")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and inspect expense lists.
    List(List),
    /// Share a list or revoke access (owner-only).
    Member(Member),
    Expense(Expense),
    /// Net balance per participant.
    Balances(BalancesArgs),
    Settle(Settle),
    /// Sharing and settlement history.
    Log(ListArg),
}

#[derive(Args, Debug)]
pub struct ListArg {
    #[arg(long = "list")]
    pub list_id: Uuid,
}

#[derive(Args, Debug)]
pub struct List {
    #[command(subcommand)]
    pub command: ListCommand,
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    Show(ListArg),
    /// Lists owned by or shared with you.
    Lists,
}

#[derive(Args, Debug)]
pub struct Member {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Add(MemberArgs),
    Remove(MemberArgs),
}

#[derive(Args, Debug)]
pub struct MemberArgs {
    #[arg(long = "list")]
    pub list_id: Uuid,
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAddArgs),
    List(ListArg),
    Delete {
        #[arg(long = "list")]
        list_id: Uuid,
        #[arg(long = "expense")]
        expense_id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    #[arg(long = "list")]
    pub list_id: Uuid,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub amount: f64,
    #[arg(long)]
    pub payer: String,
    #[arg(long, default_value = "dynamic", value_parser = parse_policy)]
    pub split: SplitPolicy,
    /// Split participant for `equal`/`dynamic`; defaults to every member.
    #[arg(long = "with", value_name = "EMAIL")]
    pub with: Vec<String>,
    /// Share for `percentage`/`fixed`; defaults to an even split.
    #[arg(long = "item", value_name = "EMAIL=VALUE", value_parser = parse_item)]
    pub items: Vec<(String, f64)>,
    #[arg(long, value_parser = parse_category)]
    pub category: Option<Category>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct BalancesArgs {
    #[arg(long = "list")]
    pub list_id: Uuid,
    /// Include confirmed settlements.
    #[arg(long)]
    pub adjusted: bool,
}

#[derive(Args, Debug)]
pub struct Settle {
    #[command(subcommand)]
    pub command: SettleCommand,
}

#[derive(Subcommand, Debug)]
pub enum SettleCommand {
    /// Payments that would settle the list.
    Suggest(ListArg),
    /// Record a payment you made; the recipient confirms it.
    Record {
        #[arg(long = "list")]
        list_id: Uuid,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Record a payment you already received.
    Received {
        #[arg(long = "list")]
        list_id: Uuid,
        #[arg(long)]
        from: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
    },
    Confirm(SettlementArgs),
    Reject(SettlementArgs),
    List {
        #[arg(long = "list")]
        list_id: Uuid,
        #[arg(long, value_parser = parse_status)]
        status: Option<SettlementStatus>,
    },
}

#[derive(Args, Debug)]
pub struct SettlementArgs {
    #[arg(long = "list")]
    pub list_id: Uuid,
    #[arg(long = "settlement")]
    pub settlement_id: Uuid,
}

fn parse_policy(raw: &str) -> Result<SplitPolicy, String> {
    SplitPolicy::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_status(raw: &str) -> Result<SettlementStatus, String> {
    SettlementStatus::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<Category, String> {
    Ok(Category::from_name(raw))
}

fn parse_item(raw: &str) -> Result<(String, f64), String> {
    let (email, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected EMAIL=VALUE, got {raw}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid value for {email}: {err}"))?;
    Ok((email.trim().to_string(), value))
}
