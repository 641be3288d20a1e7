use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use lantern_config::Config;
use lantern_policy::{
	PolicyEngine, PolicyEvaluationResult, PolicyInfo, ResolvedResourceSpec, ResourceSpec, Urn,
};
use lantern_search::{EntitySpec, Filter, SearchQueryBuilder, SortCriterion, SortOrder};
use lantern_testkit::InMemoryEntityLookup;

#[derive(Debug, Parser)]
#[command(
	version = lantern_cli::VERSION,
	rename_all = "kebab",
	styles = lantern_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Prints the search query composed for TEXT.
	Query {
		#[arg(long, short = 'e', value_name = "FILE")]
		entities: PathBuf,
		/// Treat TEXT as `field:value` syntax instead of free text.
		#[arg(long)]
		structured: bool,
		#[arg(value_name = "TEXT")]
		text: String,
	},
	/// Prints the boolean query compiled from a filter document.
	Filter {
		#[arg(long)]
		timeseries: bool,
		#[arg(long, value_name = "FIELD")]
		sort_field: Option<String>,
		#[arg(long, requires = "sort_field")]
		ascending: bool,
		#[arg(value_name = "FILE")]
		filter: PathBuf,
	},
	/// Prints GRANTED when any policy grants PRIVILEGE to the actor.
	Authorize {
		#[command(flatten)]
		access: AccessArgs,
		#[arg(long, value_name = "URN")]
		actor: String,
		#[arg(long, value_name = "PRIVILEGE")]
		privilege: String,
	},
	/// Prints every privilege the policies grant to the actor.
	Privileges {
		#[command(flatten)]
		access: AccessArgs,
		#[arg(long, value_name = "URN")]
		actor: String,
	},
	/// Prints the actors each policy grants to.
	Actors {
		#[command(flatten)]
		access: AccessArgs,
	},
}

#[derive(Debug, clap::Args)]
pub struct AccessArgs {
	#[arg(long, short = 'p', value_name = "FILE")]
	pub policies: PathBuf,
	/// JSON object of urn to aspect map.
	#[arg(long, short = 'e', value_name = "FILE")]
	pub entities: PathBuf,
	#[arg(long, value_name = "URN")]
	pub resource: Option<String>,
	/// Defaults to the entity type of the resource urn.
	#[arg(long, value_name = "TYPE", requires = "resource")]
	pub resource_type: Option<String>,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let config = lantern_config::load(&args.config)?;

	init_tracing(&config);

	match args.command {
		Command::Query { entities, structured, text } => query(&config, &entities, &text, !structured),
		Command::Filter { timeseries, sort_field, ascending, filter } => {
			let sort = sort_field.map(|field| SortCriterion {
				field,
				order: if ascending { SortOrder::Ascending } else { SortOrder::Descending },
			});

			compile_filter(&filter, timeseries, sort.as_ref())
		},
		Command::Authorize { access, actor, privilege } => authorize(&access, &actor, &privilege),
		Command::Privileges { access, actor } => privileges(&access, &actor),
		Command::Actors { access } => actors(&access),
	}
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn query(config: &Config, entities: &Path, text: &str, fulltext: bool) -> color_eyre::Result<()> {
	let custom = lantern_config::load_custom(&config.search.custom)?;
	let builder = SearchQueryBuilder::new(&config.search, custom.as_ref())?;
	let entity_specs: Vec<EntitySpec> = read_json(entities)?;

	if entity_specs.is_empty() {
		return Err(eyre::eyre!("Entity file must include at least one entity."));
	}

	let composed = builder.build_query(&entity_specs, text, fulltext)?;

	print_json(&composed.to_value())
}

fn compile_filter(path: &Path, timeseries: bool, sort: Option<&SortCriterion>) -> color_eyre::Result<()> {
	let filter: Filter = read_json(path)?;
	let compiled = lantern_search::build_filter_query(Some(&filter), timeseries)?;

	print_json(&serde_json::json!({
		"query": compiled.to_value(),
		"sort": lantern_search::build_sort_order(sort),
	}))
}

fn authorize(access: &AccessArgs, actor: &str, privilege: &str) -> color_eyre::Result<()> {
	let session = AccessSession::open(access)?;
	let resource = session.resource(access)?;
	let mut result = PolicyEvaluationResult::Denied;

	for policy in &session.policies {
		if session.engine.evaluate_policy_str(policy, actor, privilege, resource.as_ref())?.is_granted() {
			tracing::info!(policy = %policy.display_name, "Policy granted the request.");

			result = PolicyEvaluationResult::Granted;

			break;
		}
	}

	println!("{result}");

	Ok(())
}

fn privileges(access: &AccessArgs, actor: &str) -> color_eyre::Result<()> {
	let session = AccessSession::open(access)?;
	let resource = session.resource(access)?;
	let actor = Urn::parse(actor)?;
	let granted = session.engine.get_granted_privileges(&session.policies, &actor, resource.as_ref())?;

	print_json(&granted)
}

fn actors(access: &AccessArgs) -> color_eyre::Result<()> {
	let session = AccessSession::open(access)?;
	let resource = session.resource(access)?;
	let mut report = Vec::with_capacity(session.policies.len());

	for policy in &session.policies {
		let actors = session.engine.get_matching_actors(policy, resource.as_ref());

		report.push(serde_json::json!({ "policy": policy.display_name, "actors": actors }));
	}

	print_json(&report)
}

struct AccessSession {
	lookup: Arc<InMemoryEntityLookup>,
	engine: PolicyEngine,
	policies: Vec<PolicyInfo>,
}
impl AccessSession {
	fn open(access: &AccessArgs) -> color_eyre::Result<Self> {
		let raw = fs::read_to_string(&access.entities)
			.wrap_err_with(|| format!("Failed to read {}.", access.entities.display()))?;
		let lookup = Arc::new(InMemoryEntityLookup::from_json(&raw)?);
		let engine = PolicyEngine::new(lookup.clone());
		let policies = read_json(&access.policies)?;

		Ok(Self { lookup, engine, policies })
	}

	fn resource(&self, access: &AccessArgs) -> color_eyre::Result<Option<ResolvedResourceSpec>> {
		let Some(resource) = access.resource.as_ref() else {
			return Ok(None);
		};
		let resource_type = match access.resource_type.as_ref() {
			Some(resource_type) => resource_type.clone(),
			None => Urn::parse(resource)?.entity_type().to_string(),
		};

		Ok(Some(ResolvedResourceSpec::resolve(
			ResourceSpec::new(resource_type, resource.clone()),
			self.lookup.clone(),
		)))
	}
}

fn read_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: DeserializeOwned,
{
	let raw = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}.", path.display()))?;

	serde_json::from_str(&raw).wrap_err_with(|| format!("Failed to parse {}.", path.display()))
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: serde::Serialize,
{
	let json = serde_json::to_string_pretty(value)?;

	println!("{json}");

	Ok(())
}
