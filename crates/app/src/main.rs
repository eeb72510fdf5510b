use std::error::Error;

use clap::Parser;
use engine::{
    Engine, Expense, IdentityProvider, MembershipChange, Participant, SplitItem, SplitPolicy,
    StaticIdentity, equal_fixed_items, equal_percentage_items, format_debt,
};
use migration::{Migrator, MigratorTrait};

use cli::{
    BalancesArgs, Cli, Command, ExpenseAddArgs, ExpenseCommand, ListCommand, MemberCommand,
    SettleCommand,
};

mod cli;
mod settings;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "chipin={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let database_url = cli
        .database_url
        .clone()
        .unwrap_or(settings.database.url);
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    let identity = StaticIdentity::new(cli.actor.as_deref().map(Participant::parse).transpose()?);

    if let Err(err) = run(&engine, &identity, cli.command).await {
        tracing::debug!("command failed: {err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn connect_db(database_url: &str) -> AppResult<sea_orm::DatabaseConnection> {
    tracing::debug!("connecting to {database_url}");
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

fn current(identity: &impl IdentityProvider) -> AppResult<Participant> {
    identity
        .current_participant()
        .ok_or_else(|| "no participant: pass --as EMAIL or set CHIPIN_USER".into())
}

async fn run(engine: &Engine, identity: &impl IdentityProvider, command: Command) -> AppResult<()> {
    let actor = current(identity)?;

    match command {
        Command::List(list) => match list.command {
            ListCommand::Create { name } => {
                let list = engine.new_list(&name, &actor).await?;
                println!("{}", list.id);
            }
            ListCommand::Show(args) => {
                let list = engine.list(args.list_id, &actor).await?;
                let total = engine.list_total(args.list_id, &actor).await?;
                println!("{} ({})", list.name, list.id);
                println!("owner: {}", list.owner);
                for participant in &list.shared_with {
                    println!("shared with: {participant}");
                }
                println!("total: {total:.2}");
            }
            ListCommand::Lists => {
                for list in engine.lists_for(&actor).await? {
                    let role = if list.is_owner(&actor) { "owner" } else { "member" };
                    println!("{}\t{}\t{}", list.id, list.name, role);
                }
            }
        },
        Command::Member(member) => {
            let (change, args) = match member.command {
                MemberCommand::Add(args) => (MembershipChange::Add, args),
                MemberCommand::Remove(args) => (MembershipChange::Remove, args),
            };
            let adjusted = engine
                .update_membership(args.list_id, change, &args.email, &actor)
                .await?;
            println!("{adjusted} dynamic expenses adjusted");
        }
        Command::Expense(expense) => match expense.command {
            ExpenseCommand::Add(args) => {
                let list_id = args.list_id;
                let expense = build_expense(engine, &actor, args).await?;
                let expense = engine.save_expense(list_id, expense, &actor).await?;
                println!("{}", expense.id);
            }
            ExpenseCommand::List(args) => {
                for expense in engine.load_expenses(args.list_id, &actor).await? {
                    println!(
                        "{}\t{}\t{:.2}\t{}\t{}\t{}",
                        expense.id,
                        expense.date.format("%Y-%m-%d"),
                        expense.amount,
                        expense.payer,
                        expense.policy.as_str(),
                        expense.description
                    );
                }
            }
            ExpenseCommand::Delete {
                list_id,
                expense_id,
            } => {
                engine.delete_expense(list_id, expense_id, &actor).await?;
                println!("deleted {expense_id}");
            }
        },
        Command::Balances(BalancesArgs { list_id, adjusted }) => {
            let balances = if adjusted {
                engine.adjusted_balances(list_id, &actor).await?
            } else {
                engine.balances(list_id, &actor).await?
            };
            for (participant, amount) in balances {
                println!("{participant}\t{amount:.2}");
            }
        }
        Command::Settle(settle) => match settle.command {
            SettleCommand::Suggest(args) => {
                let debts = engine.suggested_payments(args.list_id, &actor).await?;
                if debts.is_empty() {
                    println!("all settled up");
                }
                for debt in &debts {
                    println!("{}", format_debt(debt));
                }
            }
            SettleCommand::Record {
                list_id,
                to,
                amount,
                description,
            } => {
                let to = Participant::parse(&to)?;
                let settlement = engine
                    .record_settlement(list_id, &actor, &to, amount, description.as_deref(), &actor)
                    .await?;
                println!("{} ({})", settlement.id, settlement.status.as_str());
            }
            SettleCommand::Received {
                list_id,
                from,
                amount,
                description,
            } => {
                let from = Participant::parse(&from)?;
                let settlement = engine
                    .record_received_payment(
                        list_id,
                        &from,
                        &actor,
                        amount,
                        description.as_deref(),
                        &actor,
                    )
                    .await?;
                println!("{} ({})", settlement.id, settlement.status.as_str());
            }
            SettleCommand::Confirm(args) => {
                let settlement = engine
                    .confirm_settlement(args.list_id, args.settlement_id, &actor)
                    .await?;
                println!("{} {}", settlement.id, settlement.status.as_str());
            }
            SettleCommand::Reject(args) => {
                let settlement = engine
                    .reject_settlement(args.list_id, args.settlement_id, &actor)
                    .await?;
                println!("{} {}", settlement.id, settlement.status.as_str());
            }
            SettleCommand::List { list_id, status } => {
                for s in engine.load_settlements(list_id, &actor, status).await? {
                    println!(
                        "{}\t{}\t{} -> {}\t{:.2}\t{}",
                        s.id,
                        s.date.format("%Y-%m-%d"),
                        s.from,
                        s.to,
                        s.amount,
                        s.status.as_str()
                    );
                }
            }
        },
        Command::Log(args) => {
            for entry in engine.activity_log(args.list_id, &actor).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.actor,
                    entry.action.as_str(),
                    entry.subject
                );
            }
        }
    }
    Ok(())
}

/// Fills in the split the add-expense form would pre-select: every member
/// for `equal`/`dynamic`, an even split for `percentage`/`fixed`.
async fn build_expense(
    engine: &Engine,
    actor: &Participant,
    args: ExpenseAddArgs,
) -> AppResult<Expense> {
    let list = engine.list(args.list_id, actor).await?;
    let with = if args.with.is_empty() {
        list.participants()
    } else {
        args.with
            .iter()
            .map(|email| Participant::parse(email))
            .collect::<Result<Vec<_>, _>>()?
    };

    let items = if !args.items.is_empty() {
        args.items
            .iter()
            .map(|(email, value)| Ok(SplitItem::new(Participant::parse(email)?, *value)))
            .collect::<AppResult<Vec<_>>>()?
    } else {
        match args.split {
            SplitPolicy::Percentage => equal_percentage_items(&with),
            SplitPolicy::Fixed => equal_fixed_items(args.amount, &with),
            SplitPolicy::Equal | SplitPolicy::Dynamic => Vec::new(),
        }
    };

    let expense = Expense::new(
        &args.description,
        args.amount,
        Participant::parse(&args.payer)?,
        args.split,
        actor.clone(),
        chrono::Utc::now(),
    )
    .with_participants(with)
    .with_items(items)
    .with_category(args.category.unwrap_or_default())
    .with_notes(args.notes.as_deref());
    Ok(expense)
}
