use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn, Level};

use gourmelist::database::StoreRepository;
use gourmelist::model::tag::{filter_tag_buttons, normalize_tags, tag_buttons};
use gourmelist::model::{Store, StoreDetail, VisitationStatus};
use gourmelist::photos::{self, PhotoStore};
use gourmelist::places::google::GoogleClient;
use gourmelist::places::{AutocompleteSession, MapState};
use gourmelist::state::{EditorState, HomeController, LookupRequest, LookupResponse, LookupWorker};
use gourmelist::utils::config::{self, AppConfig, Overrides};

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep track of restaurants you visited or want to visit", long_about = None)]
struct Cli {
    /// Directory holding the database and photos
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Places API key (overrides GOURMELIST_PLACES_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a store
    Add {
        name: String,
        #[command(flatten)]
        fields: StoreFields,
    },
    /// Edit a store
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: StoreFields,
        /// Drop all tags before applying --tag
        #[arg(long)]
        clear_tags: bool,
        /// Remove an attached photo by its position in `show`
        #[arg(long = "remove-photo")]
        remove_photos: Vec<usize>,
        #[arg(short, long)]
        yes: bool,
    },
    /// List stores of one visitation status
    List {
        #[arg(long, default_value = "visited")]
        status: VisitationStatus,
        /// Only stores carrying every given tag
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Case-insensitive name search
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one store with its map pin and photos
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a store and its photos
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// Interactive place search; `#N` picks suggestion N
    Search,
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the resolved configuration to ./.env
    Init,
}

#[derive(Subcommand, Debug)]
enum TagCommand {
    Add { name: String },
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    Delete {
        name: String,
        /// Also strip the tag from stores that carry it
        #[arg(long)]
        cascade: bool,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct StoreFields {
    #[arg(long)]
    status: Option<VisitationStatus>,
    /// YYYY-MM-DD
    #[arg(long)]
    visit_date: Option<NaiveDate>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    memo: Option<String>,
    #[arg(long)]
    hours: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    /// Image file or directory of images
    #[arg(long = "photo")]
    photos: Vec<PathBuf>,
    /// Prefill from the first place suggestion for this query
    #[arg(long)]
    place: Option<String>,
}

impl StoreFields {
    fn apply(&self, detail: &mut StoreDetail) {
        if let Some(status) = self.status {
            detail.visitation_status = status;
        }
        if let Some(date) = self.visit_date {
            detail.visit_date = date;
        }
        detail.selected_tags.extend(self.tags.iter().cloned());
        detail.selected_tags = normalize_tags(&detail.selected_tags);
        let set = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.clone();
            }
        };
        set(&mut detail.memo, &self.memo);
        set(&mut detail.business_hours, &self.hours);
        set(&mut detail.phone_number, &self.phone);
        set(&mut detail.address, &self.address);
    }
}

struct App {
    repo: StoreRepository,
    photos: PhotoStore,
    places: Option<Arc<GoogleClient>>,
}

impl App {
    fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;
        let repo = StoreRepository::open(&config.database_path())?;
        let photos = PhotoStore::new(config.documents_dir())?;
        let places = match GoogleClient::new(config.places_api_key.as_deref()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                info!("Place lookups unavailable: {}", e);
                None
            }
        };
        Ok(Self {
            repo,
            photos,
            places,
        })
    }

    fn places(&self) -> Result<&GoogleClient> {
        self.places
            .as_deref()
            .ok_or_else(|| anyhow!("This needs a places API key (--api-key or {})", config::API_KEY_KEY))
    }
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(Overrides {
        data_dir: cli.data_dir,
        places_api_key: cli.api_key,
    })?;

    if let Command::Config {
        command: ConfigCommand::Init,
    } = cli.command
    {
        config::save_to_env(Path::new(".env"), &config)?;
        println!("Wrote .env ({})", config.data_dir.display());
        return Ok(());
    }

    let mut app = App::open(config)?;
    match cli.command {
        Command::Add { name, fields } => add_store(&app, name, &fields),
        Command::Edit {
            id,
            name,
            fields,
            clear_tags,
            remove_photos,
            yes,
        } => edit_store(&app, id, name, &fields, clear_tags, &remove_photos, yes),
        Command::List {
            status,
            tags,
            name,
            json,
        } => list_stores(&app, status, tags, name.unwrap_or_default(), json),
        Command::Show { id, json } => show_store(&app, id, json),
        Command::Delete { id, yes } => delete_store(&app, id, yes),
        Command::Tag { command } => run_tag(&mut app, command),
        Command::Search => interactive_search(&app),
        Command::Config { .. } => Ok(()),
    }
}

fn add_store(app: &App, name: String, fields: &StoreFields) -> Result<()> {
    let mut editor = EditorState::register();
    if let Some(query) = &fields.place {
        prefill_from_place(app, &mut editor, query)?;
    }
    if !name.trim().is_empty() {
        editor.detail.store_name = name;
    }
    fields.apply(&mut editor.detail);
    save_editor(app, &mut editor, fields)
}

fn edit_store(
    app: &App,
    id: i64,
    name: Option<String>,
    fields: &StoreFields,
    clear_tags: bool,
    remove_photos: &[usize],
    yes: bool,
) -> Result<()> {
    let store = app
        .repo
        .fetch_store(id)?
        .ok_or_else(|| anyhow!("No store with id {}", id))?;
    let mut editor = EditorState::edit(store, &app.photos);

    if let Some(query) = &fields.place {
        prefill_from_place(app, &mut editor, query)?;
    }
    if let Some(name) = name {
        editor.detail.store_name = name;
    }
    if clear_tags {
        editor.detail.selected_tags.clear();
    }
    fields.apply(&mut editor.detail);

    for &index in remove_photos {
        editor.photos.selected_indexes.insert(index);
    }
    if editor.request_photo_delete() {
        let count = editor.photos.selected_indexes.len();
        if confirm(&format!("Delete {} photo(s)?", count), yes)? {
            editor.confirm_photo_delete();
        } else {
            editor.cancel_photo_delete();
        }
    }

    save_editor(app, &mut editor, fields)
}

fn prefill_from_place(app: &App, editor: &mut EditorState, query: &str) -> Result<()> {
    let client = app.places()?;
    let Some(first) = editor.search_places(client, query).first().cloned() else {
        warn!("No place suggestions for '{}'", query);
        return Ok(());
    };
    info!("Using place '{}'", first.full_text);
    editor.pick_place(client, client, &first);
    Ok(())
}

fn save_editor(app: &App, editor: &mut EditorState, fields: &StoreFields) -> Result<()> {
    if !fields.photos.is_empty() {
        editor.attach(photos::load_pending(&fields.photos)?);
    }
    for tag in &editor.detail.selected_tags {
        if app.repo.add_tag(tag)? {
            info!("Created tag '{}'", tag);
        }
    }
    if let Some(client) = app.places.as_deref() {
        editor.locate(client);
    }

    let id = editor.submit(&app.repo, &app.photos)?;
    println!("Saved store {} '{}'", id, editor.detail.store_name);
    if let Some(pin) = &editor.map.pin {
        println!(
            "  pinned at {:.6}, {:.6} ({})",
            pin.coordinate.latitude, pin.coordinate.longitude, pin.title
        );
    }
    Ok(())
}

fn list_stores(
    app: &App,
    status: VisitationStatus,
    tags: Vec<String>,
    name: String,
    json: bool,
) -> Result<()> {
    let mut home = HomeController::new(&app.repo, &app.photos)?;
    home.select_status(status)?;
    home.set_tags(tags);
    home.set_name_query(name);

    let stores = home.visible_stores();
    if json {
        println!("{}", serde_json::to_string_pretty(&stores)?);
        return Ok(());
    }
    if stores.is_empty() {
        println!("No {} stores yet. Add one with `gourmelist add`.", status);
        return Ok(());
    }
    for store in stores {
        let date = store
            .visited_on()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tags = if store.selected_tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", store.selected_tags.join(" #"))
        };
        println!("{:>4}  {}  {}{}", store.id.unwrap_or_default(), date, store.name, tags);
    }
    Ok(())
}

#[derive(Serialize)]
struct StoreOverview<'a> {
    id: i64,
    detail: &'a StoreDetail,
    visited_on: Option<NaiveDate>,
    photos: Vec<PathBuf>,
    map: &'a MapState,
}

fn show_store(app: &App, id: i64, json: bool) -> Result<()> {
    let store = app
        .repo
        .fetch_store(id)?
        .ok_or_else(|| anyhow!("No store with id {}", id))?;
    let detail = StoreDetail::from_store(&store);
    let photos: Vec<PathBuf> = app
        .photos
        .load(&store.file_names)
        .into_iter()
        .map(|p| app.photos.path_for(&p.file_name))
        .collect();

    let mut map = MapState::default();
    if let (Some(client), Some(address)) = (app.places.as_deref(), store.address.as_deref()) {
        gourmelist::places::resolve_address(client, address, &mut map);
    }

    if json {
        let overview = StoreOverview {
            id,
            detail: &detail,
            visited_on: store.visited_on(),
            photos,
            map: &map,
        };
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("{} ({})", detail.store_name, detail.visitation_status);
    if let Some(date) = store.visited_on() {
        println!("  visited:  {}", date);
    }
    if !detail.selected_tags.is_empty() {
        println!("  tags:     #{}", detail.selected_tags.join(" #"));
    }
    println!("  memo:     {}", detail.memo);
    println!("  hours:    {}", detail.business_hours.replace('\n', "\n            "));
    println!("  phone:    {}", detail.phone_number);
    println!("  address:  {}", detail.address);
    if let Some(viewport) = &map.viewport {
        println!(
            "  map:      {:.6}, {:.6} (span {}°)",
            viewport.center.latitude, viewport.center.longitude, viewport.latitude_delta
        );
    }
    for (i, photo) in photos.iter().enumerate() {
        println!("  photo {}:  {}", i, photo.display());
    }
    Ok(())
}

fn delete_store(app: &App, id: i64, yes: bool) -> Result<()> {
    let store = app
        .repo
        .fetch_store(id)?
        .ok_or_else(|| anyhow!("No store with id {}", id))?;
    if !confirm(&format!("Delete '{}'? This cannot be undone.", store.name), yes)? {
        println!("Cancelled");
        return Ok(());
    }

    let mut home = HomeController::new(&app.repo, &app.photos)?;
    home.select_status(store.visitation_status)?;
    home.request_delete(id);
    if let Some(removed) = home.confirm_delete()? {
        println!("Deleted '{}'", removed.name);
    }
    Ok(())
}

fn run_tag(app: &mut App, command: TagCommand) -> Result<()> {
    match command {
        TagCommand::Add { name } => {
            if app.repo.add_tag(&name)? {
                println!("Added tag '{}'", name.trim());
            } else {
                println!("Tag '{}' already exists", name.trim());
            }
        }
        TagCommand::List { query } => {
            let buttons = tag_buttons(&app.repo.fetch_tags()?);
            for button in filter_tag_buttons(&buttons, &query) {
                println!("#{}", button.name);
            }
        }
        TagCommand::Delete { name, cascade, yes } => {
            if !confirm(&format!("Delete tag '{}'? This cannot be undone.", name), yes)? {
                println!("Cancelled");
                return Ok(());
            }
            let touched = app.repo.delete_tag(&name, cascade)?;
            println!("Deleted tag '{}' ({} stores updated)", name, touched);
        }
    }
    Ok(())
}

fn interactive_search(app: &App) -> Result<()> {
    let client = app
        .places
        .clone()
        .ok_or_else(|| anyhow!("Search needs a places API key (--api-key or {})", config::API_KEY_KEY))?;
    let worker = LookupWorker::spawn(client, 2);
    let mut session = AutocompleteSession::default();

    eprintln!("Type a store or place name; `#N` shows details of suggestion N; Ctrl-D quits.");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let input = line.trim();

        if let Some(pick) = input.strip_prefix('#') {
            let index: usize = match pick.parse() {
                Ok(i) => i,
                Err(_) => {
                    eprintln!("Not a suggestion number: {}", pick);
                    continue;
                }
            };
            let Some(suggestion) = session.suggestions().get(index).cloned() else {
                eprintln!("No suggestion {}", index);
                continue;
            };
            worker.submit(LookupRequest::Details {
                place_id: suggestion.place_id.clone(),
                session_token: session.session_token().to_string(),
            });
            session.end_session();
            wait_for_details(&worker, &suggestion.place_id);
            continue;
        }

        match session.begin(input) {
            Some(ticket) => {
                worker.submit(LookupRequest::Autocomplete(ticket));
                wait_for_suggestions(&worker, &mut session);
            }
            None => println!("(cleared)"),
        }
    }
    Ok(())
}

fn wait_for_suggestions(worker: &LookupWorker, session: &mut AutocompleteSession) {
    while let Ok(response) = worker.responses().recv_timeout(Duration::from_secs(15)) {
        if let LookupResponse::Suggestions { ticket, result } = response {
            if session.complete(&ticket, result) {
                for (i, s) in session.suggestions().iter().enumerate() {
                    println!("{:>2}  {}", i, s.full_text);
                }
                return;
            }
        }
    }
    warn!("Timed out waiting for suggestions");
}

fn wait_for_details(worker: &LookupWorker, place_id: &str) {
    while let Ok(response) = worker.responses().recv_timeout(Duration::from_secs(15)) {
        let LookupResponse::Details { place_id: id, result } = response else {
            continue;
        };
        if id != place_id {
            continue;
        }
        match result {
            Ok(details) => {
                let mut detail = StoreDetail::from_store(&Store::default());
                details.apply_to(&mut detail);
                println!("{}", detail.store_name);
                println!("  address: {}", detail.address);
                println!("  phone:   {}", detail.phone_number);
                println!("  hours:   {}", detail.business_hours.replace('\n', "\n           "));
            }
            Err(e) => warn!("Place details failed: {}", e),
        }
        return;
    }
    warn!("Timed out waiting for place details");
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
