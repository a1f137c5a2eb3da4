//! `restpki` command-line front end
//!
//! Starts and finishes signature sessions against a remote signing service,
//! fetches positioning presets and manages the client configuration.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use restpki_client::services::presets::SamplePosition;
use restpki_client::{
    certificate_subject, Authenticator, CadesSignatureExplorer, CadesSignatureFinisher,
    CadesSignatureStarter, ClientConfiguration, ConfigManager, Container, ExportFormat,
    HorizontalAlign, OpenedSignature, PadesSignatureExplorer, PadesSignatureFinisher,
    PadesSignatureStarter, PadesVisualPositioningPresets, RestPkiClient,
    SessionToken, SignatureElementLocation, StandardSignaturePolicies, VisualRepresentation,
    VisualText, XmlInsertionOption, XmlSignatureFinisher, XmlSignatureKind, XmlSignatureStarter,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restpki")]
#[command(about = "Start and finish remote PAdES, CAdES and XAdES signature sessions")]
#[command(long_about = "
restpki - client for a remote signing service

A signature is produced in two steps. `start` uploads the document and
prints a token; the token is signed in the browser by the signing
component; `finish` finalizes the token and writes the signed file.

EXAMPLES:
    # Start a PDF signature with a footnote stamp
    restpki pades start contract.pdf --visual footnote

    # Finish it and write the signed PDF
    restpki pades finish <TOKEN> -o contract-signed.pdf

    # Detached CMS signature
    restpki cades start report.docx --detached

    # Inspect the footnote preset for the last page, two rows
    restpki preset footnote --page -1 --rows 2

ENVIRONMENT VARIABLES:
    RESTPKI_ENDPOINT        Service URL (default https://pki.rest/)
    RESTPKI_ACCESS_TOKEN    API access token
    RUST_LOG                Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Service URL (overrides the configuration file)
    #[arg(long, global = true, env = "RESTPKI_ENDPOINT")]
    endpoint: Option<String>,

    /// API access token (overrides the configuration file)
    #[arg(long, global = true, env = "RESTPKI_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Configuration file (defaults to the user configuration directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Certificate authentication
    #[command(subcommand)]
    Auth(AuthCommands),

    /// PDF signatures
    #[command(subcommand)]
    Pades(PadesCommands),

    /// CMS signatures
    #[command(subcommand)]
    Cades(CadesCommands),

    /// XML signatures
    #[command(subcommand)]
    Xml(XmlCommands),

    /// Visual positioning presets
    #[command(subcommand)]
    Preset(PresetCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Print the configuration file path
    Path,

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        /// Configuration file to import
        file: PathBuf,
        /// Import format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Request an authentication token
    Start {
        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,
    },

    /// Complete an authentication and print the certificate validation
    Complete {
        token: SessionToken,
    },
}

#[derive(Subcommand)]
enum PadesCommands {
    /// Upload a PDF and print the session token
    Start {
        #[arg(value_name = "PDF_FILE")]
        file: PathBuf,

        /// Visual stamp to add
        #[arg(long, value_enum)]
        visual: Option<VisualArg>,

        /// Signature policy id
        #[arg(long, default_value = StandardSignaturePolicies::PADES_BASIC)]
        policy: String,

        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,

        /// Value echoed back by the finish call
        #[arg(long)]
        callback: Option<String>,
    },

    /// Finalize a token and write the signed PDF
    Finish {
        token: SessionToken,
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: PathBuf,
    },

    /// List and validate the signers of a signed PDF
    Open {
        #[arg(value_name = "PDF_FILE")]
        file: PathBuf,

        /// Only list the signers
        #[arg(long)]
        no_validate: bool,

        /// Policy for signers without an explicit one
        #[arg(long, default_value = StandardSignaturePolicies::PADES_BASIC)]
        policy: String,

        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Subcommand)]
enum CadesCommands {
    /// Upload content (or a CMS to co-sign) and print the session token
    Start {
        /// Content to sign; omit when co-signing
        #[arg(value_name = "FILE", required_unless_present = "cosign")]
        file: Option<PathBuf>,

        /// Existing CMS to add a signature to
        #[arg(long, value_name = "CMS_FILE", conflicts_with = "file")]
        cosign: Option<PathBuf>,

        /// Do not encapsulate the content in the CMS
        #[arg(long)]
        detached: bool,

        /// Signature policy id
        #[arg(long, default_value = StandardSignaturePolicies::CADES_BES)]
        policy: String,

        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,
    },

    /// Finalize a token and write the CMS
    Finish {
        token: SessionToken,
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: PathBuf,
    },

    /// List and validate the signers of a CMS
    Open {
        #[arg(value_name = "CMS_FILE")]
        file: PathBuf,

        /// Signed data of a detached CMS
        #[arg(long, value_name = "DATA_FILE")]
        data: Option<PathBuf>,

        /// Only list the signers
        #[arg(long)]
        no_validate: bool,

        /// Policy for signers without an explicit one
        #[arg(long, default_value = StandardSignaturePolicies::CADES_BES)]
        policy: String,

        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Subcommand)]
enum XmlCommands {
    /// Upload an XML document and print the session token
    Start {
        #[arg(value_name = "XML_FILE")]
        file: PathBuf,

        /// What to sign
        #[arg(long, value_enum, default_value = "full")]
        kind: XmlKindArg,

        /// Id of the element to sign (element signatures)
        #[arg(long, required_if_eq("kind", "element"))]
        element_id: Option<String>,

        /// XPath of the node the signature is appended to
        #[arg(long)]
        xpath: Option<String>,

        /// Signature policy id
        #[arg(long, default_value = StandardSignaturePolicies::XML_XADES_BES)]
        policy: String,

        /// Security context (defaults to the configured one)
        #[arg(long)]
        context: Option<String>,
    },

    /// Finalize a token and write the signed XML
    Finish {
        token: SessionToken,
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// Footnote layout
    Footnote {
        /// Page number; 0 appends a page, negative counts from the end
        #[arg(long, allow_hyphen_values = true)]
        page: Option<i32>,
        /// Rows of signatures to reserve room for
        #[arg(long)]
        rows: Option<u32>,
    },

    /// New page layout
    NewPage,
}

#[derive(ValueEnum, Clone, Copy)]
enum VisualArg {
    Footnote,
    NewPage,
    Manual,
}

impl From<VisualArg> for SamplePosition {
    fn from(arg: VisualArg) -> Self {
        match arg {
            VisualArg::Footnote => SamplePosition::Footnote,
            VisualArg::NewPage => SamplePosition::NewPage,
            VisualArg::Manual => SamplePosition::Manual,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum XmlKindArg {
    Full,
    Element,
}

impl From<XmlKindArg> for XmlSignatureKind {
    fn from(arg: XmlKindArg) -> Self {
        match arg {
            XmlKindArg::Full => XmlSignatureKind::Full,
            XmlKindArg::Element => XmlSignatureKind::Element,
        }
    }
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    if let Commands::Config(config_cmd) = cli.command {
        return handle_config_command(&config_manager, config_cmd);
    }

    let mut configuration = config_manager.load_or_default()?;
    configuration.apply_overrides(cli.endpoint.clone(), cli.access_token.clone());
    let client = RestPkiClient::from_configuration(&configuration)?;

    match cli.command {
        Commands::Config(_) => Ok(()),
        Commands::Auth(cmd) => handle_auth_command(client, &configuration, cmd).await,
        Commands::Pades(cmd) => handle_pades_command(client, &configuration, cmd).await,
        Commands::Cades(cmd) => handle_cades_command(client, &configuration, cmd).await,
        Commands::Xml(cmd) => handle_xml_command(client, &configuration, cmd).await,
        Commands::Preset(cmd) => handle_preset_command(client, cmd).await,
    }
}

fn print_token(token: Option<SessionToken>) -> Result<()> {
    match token {
        Some(token) => {
            println!("{token}");
            Ok(())
        }
        None => Err(miette::miette!("The service did not return a token")),
    }
}

fn print_signer(certificate: Option<&serde_json::Value>) {
    if let Some(subject) = certificate.and_then(certificate_subject) {
        println!("Signed by: {subject}");
    }
}

fn print_opened(opened: &OpenedSignature) -> Result<()> {
    for (index, signer) in opened.signers.iter().enumerate() {
        let subject = signer
            .certificate
            .as_ref()
            .and_then(certificate_subject)
            .unwrap_or("unknown signer");
        println!("Signer {}: {subject}", index + 1);
        if let Some(time) = &signer.signing_time {
            println!("  Signing time: {time}");
        }
        println!(
            "  Message digest: {} {}",
            signer.message_digest.algorithm,
            signer.message_digest.hex_value()
        );
        if let Some(results) = &signer.validation_results {
            println!("{}", results.to_string_indented(1));
        }
    }
    let validated = opened.signers.iter().any(|s| s.validation_results.is_some());
    if validated && !opened.is_valid() {
        return Err(miette::miette!("At least one signature is not valid"));
    }
    Ok(())
}

fn context_or_default(context: Option<String>, configuration: &ClientConfiguration) -> String {
    context.unwrap_or_else(|| configuration.default_security_context.clone())
}

async fn handle_auth_command(
    client: RestPkiClient,
    configuration: &ClientConfiguration,
    cmd: AuthCommands,
) -> Result<()> {
    let mut authenticator = Authenticator::new(client);
    match cmd {
        AuthCommands::Start { context } => {
            let token = authenticator
                .start_with_webpki(context_or_default(context, configuration))
                .await?;
            print_token(token)
        }
        AuthCommands::Complete { token } => {
            let results = authenticator.complete_with_webpki(&token).await?;
            print_signer(authenticator.certificate()?);
            println!("{results}");
            if results.is_valid() {
                Ok(())
            } else {
                Err(miette::miette!("Authentication failed"))
            }
        }
    }
}

/// Stamp with the signer name and signing time inside the chosen layout
async fn visual_representation(
    client: &RestPkiClient,
    visual: VisualArg,
) -> Result<VisualRepresentation> {
    let presets = PadesVisualPositioningPresets::new(client.clone());
    let position = SamplePosition::from(visual).resolve(&presets).await?;
    Ok(VisualRepresentation::new(position).with_text(
        VisualText::new("Signed by {{signerName}} ({{signerNationalId}})")
            .with_font_size(13.0)
            .with_signing_time()
            .with_horizontal_align(HorizontalAlign::Left)
            .with_container(Container::margins(0.2)),
    ))
}

async fn handle_pades_command(
    client: RestPkiClient,
    configuration: &ClientConfiguration,
    cmd: PadesCommands,
) -> Result<()> {
    match cmd {
        PadesCommands::Start {
            file,
            visual,
            policy,
            context,
            callback,
        } => {
            let representation = match visual {
                Some(visual) => Some(visual_representation(&client, visual).await?),
                None => None,
            };

            let mut starter = PadesSignatureStarter::new(client);
            starter
                .set_pdf_to_sign_path(&file)?
                .set_signature_policy(policy)
                .set_security_context(context_or_default(context, configuration));
            if let Some(representation) = representation {
                starter.set_visual_representation(representation);
            }
            if let Some(callback) = callback {
                starter.set_callback_argument(callback);
            }
            print_token(starter.start_with_webpki().await?)
        }
        PadesCommands::Finish { token, output } => {
            let mut finisher = PadesSignatureFinisher::new(client);
            finisher.set_token(token);
            finisher.finish().await?;
            finisher.write_signed_pdf_to_path(&output)?;
            print_signer(finisher.certificate()?);
            if let Some(argument) = finisher.callback_argument()? {
                println!("Callback argument: {argument}");
            }
            println!("Signed PDF written to {}", output.display());
            Ok(())
        }
        PadesCommands::Open {
            file,
            no_validate,
            policy,
            context,
        } => {
            let mut explorer = PadesSignatureExplorer::new(client);
            explorer
                .set_signature_file(&file)?
                .set_validate(!no_validate)
                .set_default_signature_policy(policy)
                .set_security_context(context_or_default(context, configuration));
            print_opened(&explorer.open().await?)
        }
    }
}

async fn handle_cades_command(
    client: RestPkiClient,
    configuration: &ClientConfiguration,
    cmd: CadesCommands,
) -> Result<()> {
    match cmd {
        CadesCommands::Start {
            file,
            cosign,
            detached,
            policy,
            context,
        } => {
            let mut starter = CadesSignatureStarter::new(client);
            if let Some(file) = &file {
                starter.set_file_to_sign(file)?;
            }
            if let Some(cms) = &cosign {
                starter.set_cms_file_to_co_sign(cms)?;
            }
            starter
                .set_encapsulate_content(!detached)
                .set_signature_policy(policy)
                .set_security_context(context_or_default(context, configuration));
            print_token(starter.start_with_webpki().await?)
        }
        CadesCommands::Finish { token, output } => {
            let mut finisher = CadesSignatureFinisher::new(client);
            finisher.set_token(token);
            finisher.finish().await?;
            finisher.write_cms_to_path(&output)?;
            print_signer(finisher.certificate()?);
            println!("CMS written to {}", output.display());
            Ok(())
        }
        CadesCommands::Open {
            file,
            data,
            no_validate,
            policy,
            context,
        } => {
            let mut explorer = CadesSignatureExplorer::new(client);
            explorer.set_signature_file(&file)?;
            if let Some(data) = &data {
                explorer.set_data_file(data)?;
            }
            explorer
                .set_validate(!no_validate)
                .set_default_signature_policy(policy)
                .set_security_context(context_or_default(context, configuration));
            print_opened(&explorer.open().await?)
        }
    }
}

async fn handle_xml_command(
    client: RestPkiClient,
    configuration: &ClientConfiguration,
    cmd: XmlCommands,
) -> Result<()> {
    match cmd {
        XmlCommands::Start {
            file,
            kind,
            element_id,
            xpath,
            policy,
            context,
        } => {
            let mut starter = XmlSignatureStarter::new(client, kind.into());
            starter
                .set_xml_to_sign_path(&file)?
                .set_signature_policy(policy)
                .set_security_context(context_or_default(context, configuration));
            if let Some(element_id) = element_id {
                starter.set_element_to_sign_id(element_id);
            }
            if let Some(xpath) = xpath {
                starter.set_signature_element_location(SignatureElementLocation::new(
                    xpath,
                    XmlInsertionOption::AppendChild,
                )?);
            }
            print_token(starter.start_with_webpki().await?)
        }
        XmlCommands::Finish { token, output } => {
            let mut finisher = XmlSignatureFinisher::new(client);
            finisher.set_token(token);
            finisher.finish().await?;
            finisher.write_signed_xml_to_path(&output)?;
            print_signer(finisher.certificate()?);
            println!("Signed XML written to {}", output.display());
            Ok(())
        }
    }
}

async fn handle_preset_command(client: RestPkiClient, cmd: PresetCommands) -> Result<()> {
    let presets = PadesVisualPositioningPresets::new(client);
    let preset = match cmd {
        PresetCommands::Footnote { page, rows } => presets.get_footnote(page, rows).await?,
        PresetCommands::NewPage => presets.get_new_page().await?,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&preset).into_diagnostic()?
    );
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                println!("Current configuration:");
                println!("  Endpoint: {}", config.endpoint_url);
                println!(
                    "  Access token: {}",
                    if config.access_token.is_some() { "set" } else { "not set" }
                );
                println!("  Timeout: {} s", config.timeout_seconds);
                println!(
                    "  Default security context: {}",
                    config.default_security_context
                );
                if let Some(user_agent) = &config.user_agent {
                    println!("  User agent: {user_agent}");
                }
                println!(
                    "  Configuration file: {}",
                    config_manager.config_path().display()
                );
            }
            Err(_) => {
                println!("No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            config_manager.load_or_create_default()?;
            println!(
                "Configuration initialized: {}",
                config_manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value)?;
            let shown = if key == "access_token" { "<redacted>" } else { value.as_str() };
            println!("Configuration updated: {key} = {shown}");
        }

        ConfigCommands::Path => {
            println!("{}", config_manager.config_path().display());
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager.export_config(format.into())?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("writing {}", output_path.display()))?;
                println!("Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading {}", file.display()))?;
            config_manager.import_config(&content, format.into())?;
            println!("Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}
