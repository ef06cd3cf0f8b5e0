//! Command execution for the `pscout` binary.
//!
//! [`App`] wires the pieces together: it loads the config, opens the token
//! file, builds one [`ApiClient`] and hands it to a [`ChatStore`] and a
//! [`ProductStore`]. Each subcommand is a thin layer over a store operation
//! followed by rendering through [`crate::pretty`].

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    error::Error,
    io::{BufRead, Write, stdin, stdout},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::{
    api::ApiService,
    chat_store::ChatStore,
    client::{
        ApiClient,
        observer::{DebugLog, SessionObserver},
    },
    commands::{Commands, ProductCommands, ProfileCommands, SearchArgs},
    config::{PartsScoutConfig, load_config},
    models::{ProfileUpdate, SearchFilters, SearchParams},
    pretty::{self, ConsoleNotifier},
    product_store::{ProductFilter, ProductStore},
    tokens::FileTokenStore,
    validation::{validate_email, validate_full_name, validate_new_password},
};

/// File name of the config inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Tells the terminal user to sign in again.
#[derive(Debug, Default)]
pub struct ConsoleSessionObserver;

impl SessionObserver for ConsoleSessionObserver {
    fn session_expired(&self) {
        warn!("Session expired");
        eprintln!("Your session has expired. Run `pscout login` to sign in again.");
    }
}

/// `--config` when given, else `config.yaml` in the config directory.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(crate::config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Load the config at `path`, or the defaults when no file exists yet.
pub fn load_or_default(path: &Path) -> Result<PartsScoutConfig, Box<dyn Error>> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(PartsScoutConfig::default());
    }
    let path = path.to_str().ok_or("Config path is not valid UTF-8")?;
    load_config(path)
}

/// Write the default config to `path`.
pub fn init(path: &Path, force: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        )
        .into());
    }
    PartsScoutConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn prompt(label: &str) -> Result<String, Box<dyn Error>> {
    let mut out = stdout();
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if stdin().lock().read_line(&mut line)? == 0 {
        return Err("No input".into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn password_or_prompt(password: Option<String>) -> Result<String, Box<dyn Error>> {
    match password {
        Some(password) => Ok(password),
        None => prompt("Password: "),
    }
}

pub struct App {
    config: PartsScoutConfig,
    api: ApiService,
    chat: ChatStore,
    products: ProductStore,
    debug_log: Option<Arc<DebugLog>>,
}

impl App {
    pub fn new(config: PartsScoutConfig, debug: bool) -> Result<Self, Box<dyn Error>> {
        let tokens = FileTokenStore::new(config.token_path()?);
        debug!("Token file: {}", tokens.path().display());

        let client = ApiClient::builder(config.api_base.clone())
            .timeout(config.request_timeout())
            .token_store(Arc::new(tokens))
            .session_observer(Arc::new(ConsoleSessionObserver))
            .build()?;

        let debug_log = debug.then(|| Arc::new(DebugLog::new()));
        if let Some(log) = &debug_log {
            client.set_request_observer(log.clone());
        }

        let api = ApiService::new(client);
        let notifier = Arc::new(ConsoleNotifier);
        Ok(Self {
            chat: ChatStore::new(api.clone(), notifier.clone()),
            products: ProductStore::new(api.clone(), notifier),
            api,
            config,
            debug_log,
        })
    }

    /// Run one subcommand, then print the request log if `--debug` was given.
    pub async fn run(&mut self, command: Commands) -> Result<(), Box<dyn Error>> {
        let result = self.dispatch(command).await;
        if let Some(log) = &self.debug_log {
            eprintln!("\n--- request log ({} entries) ---", log.len());
            pretty::render_request_log(&log.entries(), &mut std::io::stderr())?;
        }
        result
    }

    async fn dispatch(&mut self, command: Commands) -> Result<(), Box<dyn Error>> {
        let mut out = stdout();
        match command {
            Commands::Init { .. } => Err("init runs before the client is built".into()),
            Commands::Login { email, password } => {
                let password = password_or_prompt(password)?;
                let response = self.api.auth.login(&email, &password).await?;
                let name = response
                    .user
                    .and_then(|user| user.full_name)
                    .unwrap_or(email);
                println!("Signed in as {name}");
                Ok(())
            }
            Commands::Register {
                email,
                full_name,
                password,
            } => {
                let email = validate_email(&email)?;
                let full_name = validate_full_name(&full_name)?;
                let password = match password {
                    Some(password) => password,
                    None => {
                        let password = prompt("Password: ")?;
                        validate_new_password(&password, &prompt("Confirm password: ")?)?;
                        password
                    }
                };
                self.api.auth.register(&email, &password, &full_name).await?;
                println!("Account created for {email}");
                Ok(())
            }
            Commands::Logout => {
                if let Err(err) = self.api.auth.logout().await {
                    warn!("Logout request failed: {}", err);
                }
                println!("Signed out");
                Ok(())
            }
            Commands::Ask {
                question,
                part_number,
                conversation,
            } => {
                if let Some(id) = conversation {
                    self.chat.load_conversation(id).await?;
                }
                self.ask(&question, part_number, &mut out).await
            }
            Commands::Interactive { conversation } => self.interactive(conversation).await,
            Commands::History { skip, limit } => {
                let limit = limit.unwrap_or(self.config.history_page_size);
                let page = self.chat.load_history(skip, limit).await?;
                pretty::render_history(self.chat.history(), None, &mut out)?;
                if page.pagination.total > 0 {
                    println!(
                        "\n{} of {} conversations",
                        self.chat.history().len(),
                        page.pagination.total
                    );
                }
                Ok(())
            }
            Commands::Show { id } => {
                let bar = spinner("Loading conversation...");
                let result = self.chat.load_conversation(id).await;
                bar.finish_and_clear();
                let detail = result?;
                println!("{}\n", detail.summary.title);
                for message in self.chat.messages() {
                    pretty::render_message(message, &mut out)?;
                    writeln!(out)?;
                }
                self.print_suggestions(&mut out)
            }
            Commands::Delete { id } => Ok(self.chat.delete_conversation(id).await?),
            Commands::New { title } => {
                let summary = self.chat.create_conversation(title.as_deref()).await?;
                println!("Created conversation {} \"{}\"", summary.id, summary.title);
                Ok(())
            }
            Commands::Products(command) => self.products(command, &mut out).await,
            Commands::Profile(command) => self.profile(command, &mut out).await,
        }
    }

    async fn ask<W: Write>(
        &mut self,
        question: &str,
        part_number: bool,
        out: &mut W,
    ) -> Result<(), Box<dyn Error>> {
        let bar = spinner("Searching...");
        let result = self.chat.send_message(question, part_number).await;
        bar.finish_and_clear();
        let reply = result?;

        pretty::render_message(&reply, out)?;
        writeln!(out)?;
        self.print_suggestions(out)
    }

    fn print_suggestions<W: Write>(&self, out: &mut W) -> Result<(), Box<dyn Error>> {
        let suggested = self.chat.suggested_products();
        if suggested.is_empty() {
            return Ok(());
        }
        writeln!(out, "Suggested products:\n")?;
        pretty::render_products(suggested, out)
    }

    async fn interactive(&mut self, conversation: Option<i64>) -> Result<(), Box<dyn Error>> {
        let mut out = stdout();
        let mut part_number = false;

        if let Some(id) = conversation {
            self.chat.load_conversation(id).await?;
            for message in self.chat.messages() {
                pretty::render_message(message, &mut out)?;
            }
        }
        println!("Type a question, /help for commands, or exit.");

        loop {
            let mode = if part_number { "part#" } else { "you" };
            let input = match prompt(&format!("\n{mode}> ")) {
                Ok(input) => input,
                Err(_) => break,
            };
            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") {
                break;
            }

            let mut words = input.split_whitespace();
            let outcome = match (words.next().unwrap_or_default(), words.next()) {
                ("/help", _) => {
                    println!("/new  /history  /open <id>  /delete <id>  /part  /products  exit");
                    Ok(())
                }
                ("/new", _) => {
                    self.chat.start_new_conversation();
                    println!("Started a new conversation.");
                    Ok(())
                }
                ("/history", _) => {
                    let limit = self.config.history_page_size;
                    match self.chat.load_history(0, limit).await {
                        Ok(_) => pretty::render_history(
                            self.chat.history(),
                            self.chat.current_conversation_id(),
                            &mut out,
                        ),
                        Err(err) => Err(err.into()),
                    }
                }
                ("/open", Some(id)) => match id.parse::<i64>() {
                    Ok(id) => match self.chat.load_conversation(id).await {
                        Ok(_) => {
                            for message in self.chat.messages() {
                                pretty::render_message(message, &mut out)?;
                            }
                            self.print_suggestions(&mut out)
                        }
                        Err(err) => Err(err.into()),
                    },
                    Err(_) => Err(format!("Not a conversation id: {id}").into()),
                },
                ("/delete", Some(id)) => match id.parse::<i64>() {
                    Ok(id) => self.chat.delete_conversation(id).await.map_err(Into::into),
                    Err(_) => Err(format!("Not a conversation id: {id}").into()),
                },
                ("/part", _) => {
                    part_number = !part_number;
                    println!(
                        "Part number search {}",
                        if part_number { "on" } else { "off" }
                    );
                    Ok(())
                }
                ("/products", _) => self.print_suggestions(&mut out),
                (command, _) if command.starts_with('/') => {
                    Err(format!("Unknown command {command}, try /help").into())
                }
                _ => self.ask(input, part_number, &mut out).await,
            };

            // Store operations already reported their failures.
            if let Err(err) = outcome {
                debug!("Interactive command failed: {}", err);
            }
        }

        info!("Leaving interactive mode");
        Ok(())
    }

    async fn products<W: Write>(
        &mut self,
        command: ProductCommands,
        out: &mut W,
    ) -> Result<(), Box<dyn Error>> {
        match command {
            ProductCommands::List { page, limit } => {
                let result = self.products.list(page, limit).await?;
                pretty::render_products(self.products.products(), out)?;
                writeln!(
                    out,
                    "Page {} · {} of {} products",
                    result.pagination.page,
                    self.products.products().len(),
                    result.pagination.total
                )?;
            }
            ProductCommands::Search(args) => self.search(args, out).await?,
            ProductCommands::Get { id } => {
                let product = self.products.get(id).await?;
                pretty::render_product(&product, out)?;
            }
            ProductCommands::Create(args) => {
                let product = self.products.create(&args.into_draft()).await?;
                pretty::render_product(&product, out)?;
            }
            ProductCommands::Update(args) => {
                let patch = args.to_patch();
                if patch.is_empty() {
                    return Err("Nothing to update".into());
                }
                let product = self.products.update(args.id, &patch).await?;
                pretty::render_product(&product, out)?;
            }
            ProductCommands::Delete { id } => self.products.delete(id).await?,
            ProductCommands::Filters => {
                let options = self.products.filter_options().await?;
                writeln!(out, "Brands:       {}", options.brands.join(", "))?;
                writeln!(out, "Models:       {}", options.models.join(", "))?;
                writeln!(out, "Availability: {}", options.availability.join(", "))?;
            }
        }
        Ok(())
    }

    async fn search<W: Write>(&mut self, args: SearchArgs, out: &mut W) -> Result<(), Box<dyn Error>> {
        let filters = SearchFilters {
            brands: (!args.brands.is_empty()).then(|| args.brands.clone()),
            models: (!args.models.is_empty()).then(|| args.models.clone()),
            availability: (!args.availability.is_empty())
                .then(|| args.availability.iter().map(ToString::to_string).collect()),
        };
        let params = SearchParams {
            search_by_part_number: args.part_number.then_some(true),
            filters: (filters != SearchFilters::default()).then_some(filters),
            sort_by: args.sort.as_param().map(str::to_string),
            ..SearchParams::new(args.query.clone())
        };

        let bar = spinner("Searching...");
        let result = self.products.search(&params).await;
        bar.finish_and_clear();
        let mut found = result?.to_vec();

        args.sort.apply(&mut found);
        let filter = ProductFilter {
            validated_only: args.validated_only,
            ..Default::default()
        };
        let shown: Vec<_> = filter.apply(&found).into_iter().cloned().collect();
        pretty::render_products(&shown, out)
    }

    async fn profile<W: Write>(
        &mut self,
        command: ProfileCommands,
        out: &mut W,
    ) -> Result<(), Box<dyn Error>> {
        match command {
            ProfileCommands::Show => {
                let profile = self.api.profile.get().await?;
                pretty::render_profile(&profile, out)?;
            }
            ProfileCommands::Update {
                full_name,
                email,
                password,
            } => {
                let password = if password {
                    let password = prompt("New password: ")?;
                    validate_new_password(&password, &prompt("Confirm password: ")?)?;
                    Some(password)
                } else {
                    None
                };
                let update = ProfileUpdate {
                    full_name: full_name.as_deref().map(validate_full_name).transpose()?,
                    email: email.as_deref().map(validate_email).transpose()?,
                    password,
                };
                let profile = self.api.profile.update(&update).await?;
                pretty::render_profile(&profile, out)?;
            }
            ProfileCommands::Avatar { path } => {
                let response = self.api.profile.upload_avatar(&path).await?;
                writeln!(out, "Avatar updated: {}", response.avatar_url)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        init(&path, false).unwrap();
        assert!(init(&path, false).is_err());
        assert!(init(&path, true).is_ok());
        assert_eq!(load_or_default(&path).unwrap(), PartsScoutConfig::default());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, PartsScoutConfig::default());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some(Path::new("/etc/pscout.yaml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/pscout.yaml"));
    }

    #[test]
    fn test_app_attaches_debug_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = PartsScoutConfig {
            token_file: Some(dir.path().join("tokens.json")),
            ..Default::default()
        };
        let app = App::new(config, true).unwrap();
        assert!(app.debug_log.is_some());
        assert!(!app.api.auth.is_authenticated());
    }
}
