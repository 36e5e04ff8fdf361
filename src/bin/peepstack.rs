use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use rand::{RngCore, SeedableRng, rngs::StdRng};

use peepstack::{
    FsResolver, JsonFileStore, MoveDirection, ReadOnlyGate, Registry, RegistryStore, RenderOptions,
    Selection, Session, WritableGate, WriteGate, encode_png,
};

#[derive(Parser, Debug)]
#[command(name = "peepstack", version)]
struct Cli {
    /// Registry JSON file.
    #[arg(long, global = true, default_value = "peepstack.json")]
    data: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a registry file with the stock layer stack.
    Init(InitArgs),
    /// Check registry invariants and print a summary.
    Validate,
    /// List categories (in render order) and their assets.
    List,
    /// Flatten a character into a PNG.
    Render(RenderArgs),
    /// Manage layer categories.
    #[command(subcommand)]
    Category(CategoryCmd),
    /// Manage the asset library.
    #[command(subcommand)]
    Asset(AssetCmd),
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Overwrite an existing registry file.
    #[arg(long)]
    force: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output size in pixels (square).
    #[arg(long, default_value_t = 1000)]
    size: u32,

    /// Selection JSON file (category id -> asset id); entries override the
    /// registry defaults.
    #[arg(long, conflicts_with = "random")]
    selection: Option<PathBuf>,

    /// Pick a random asset for every category instead of the defaults.
    #[arg(long)]
    random: bool,

    /// Seed for --random; omitting it uses OS entropy.
    #[arg(long, requires = "random")]
    seed: Option<u64>,

    /// Background color as RRGGBB or RRGGBBAA hex. Transparent if omitted.
    #[arg(long)]
    background: Option<String>,

    /// Directory asset paths resolve against. Defaults to the registry
    /// file's directory.
    #[arg(long)]
    assets_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum CategoryCmd {
    /// Add a category named NAME (id is derived from the name).
    Add { name: String },
    /// Remove a category and every asset in it.
    Rm { id: String },
    Rename { id: String, name: String },
    /// Swap draw order with the adjacent category.
    Move {
        id: String,
        #[arg(long, value_enum)]
        direction: Direction,
    },
    /// Set or clear the category's default asset.
    SetDefault {
        id: String,
        #[arg(long, conflicts_with = "clear")]
        asset: Option<String>,
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AssetCmd {
    /// Add an asset to CATEGORY. RESOURCE is a relative path or data: URL.
    Add {
        category: String,
        name: String,
        resource: String,
    },
    Rm { id: String },
    Rename { id: String, name: String },
    /// Move DRAGGED immediately before TARGET in the library listing.
    Reorder { dragged: String, target: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    Backward,
    Forward,
}

impl From<Direction> for MoveDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Backward => MoveDirection::Backward,
            Direction::Forward => MoveDirection::Forward,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.data);

    match cli.cmd {
        Command::Init(args) => cmd_init(&store, args),
        Command::Validate => cmd_validate(&store),
        Command::List => cmd_list(&store),
        Command::Render(args) => cmd_render(&cli.data, store, args),
        Command::Category(cmd) => with_write_access(&store, |reg| match cmd {
            CategoryCmd::Add { name } => {
                let cat = reg.create_category(&name)?;
                eprintln!("created category '{}' (draw order {})", cat.id, cat.draw_order);
                Ok(())
            }
            CategoryCmd::Rm { id } => {
                reg.delete_category(&id)?;
                eprintln!("deleted category '{id}'");
                Ok(())
            }
            CategoryCmd::Rename { id, name } => {
                reg.rename_category(&id, &name)?;
                eprintln!("renamed category '{id}'");
                Ok(())
            }
            CategoryCmd::Move { id, direction } => {
                reg.move_category(&id, direction.into())?;
                eprintln!("moved category '{id}'");
                Ok(())
            }
            CategoryCmd::SetDefault { id, asset, clear } => {
                if !clear && asset.is_none() {
                    anyhow::bail!("pass --asset <id> or --clear");
                }
                reg.set_default_asset(&id, asset.as_deref())?;
                eprintln!("updated default for category '{id}'");
                Ok(())
            }
        }),
        Command::Asset(cmd) => with_write_access(&store, |reg| match cmd {
            AssetCmd::Add {
                category,
                name,
                resource,
            } => {
                let asset = reg.create_asset(&category, &name, &resource)?;
                eprintln!("created asset '{}' in '{}'", asset.id, asset.category_id);
                Ok(())
            }
            AssetCmd::Rm { id } => {
                reg.delete_asset(&id)?;
                eprintln!("deleted asset '{id}'");
                Ok(())
            }
            AssetCmd::Rename { id, name } => {
                reg.rename_asset(&id, &name)?;
                eprintln!("renamed asset '{id}'");
                Ok(())
            }
            AssetCmd::Reorder { dragged, target } => {
                reg.reorder_assets(&dragged, &target)?;
                eprintln!("reordered asset '{dragged}'");
                Ok(())
            }
        }),
    }
}

fn write_gate() -> Box<dyn WriteGate> {
    match std::env::var("PEEPSTACK_READ_ONLY") {
        Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => Box::new(ReadOnlyGate),
        _ => Box::new(WritableGate),
    }
}

/// Load, mutate, persist. The capability check happens here, before the
/// mutation is ever invoked.
fn with_write_access(
    store: &JsonFileStore,
    op: impl FnOnce(&mut Registry) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    if !write_gate().can_write() {
        anyhow::bail!("library is read-only for this caller");
    }
    let mut reg = store.load().context("load registry")?;
    op(&mut reg)?;
    store.persist(&reg).context("persist registry")?;
    Ok(())
}

fn cmd_init(store: &JsonFileStore, args: InitArgs) -> anyhow::Result<()> {
    if store.path().exists() && !args.force {
        anyhow::bail!(
            "'{}' already exists (use --force to overwrite)",
            store.path().display()
        );
    }
    store.persist(&Registry::starter()).context("write starter registry")?;
    eprintln!("wrote {}", store.path().display());
    Ok(())
}

fn cmd_validate(store: &JsonFileStore) -> anyhow::Result<()> {
    let reg = store.load().context("load registry")?;
    reg.validate()?;
    eprintln!(
        "ok: {} categories, {} assets",
        reg.categories.len(),
        reg.assets.len()
    );
    Ok(())
}

fn cmd_list(store: &JsonFileStore) -> anyhow::Result<()> {
    let reg = store.load().context("load registry")?;
    for cat in reg.sorted_categories() {
        let default = cat.default_asset_id.as_deref().unwrap_or("-");
        println!("{} [{}] default={}", cat.id, cat.draw_order, default);
        for asset in reg.assets_in(&cat.id) {
            println!("  {}  {}", asset.id, asset.name);
        }
    }
    Ok(())
}

fn cmd_render(data_path: &Path, store: JsonFileStore, args: RenderArgs) -> anyhow::Result<()> {
    let mut session = Session::load(Box::new(store));

    if let Some(path) = &args.selection {
        let bytes =
            std::fs::read(path).with_context(|| format!("read selection '{}'", path.display()))?;
        let selection: Selection =
            serde_json::from_slice(&bytes).context("parse selection JSON")?;
        for (cat, asset) in selection.iter() {
            session.select(cat, Some(asset));
        }
    } else if args.random {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::rngs::OsRng.next_u64()),
        };
        session.randomize_all(&mut rng);
    }

    let assets_root = args.assets_root.clone().unwrap_or_else(|| {
        data_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    let resolver = FsResolver::new(assets_root);

    let opts = RenderOptions {
        target_size: args.size,
        clear_rgba: args.background.as_deref().map(parse_hex_rgba).transpose()?,
    };

    let frame = session.render(&resolver, &opts)?;
    let png = encode_png(&frame)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn parse_hex_rgba(s: &str) -> anyhow::Result<[u8; 4]> {
    let s = s.trim_start_matches('#');
    let parse = |range: std::ops::Range<usize>| -> anyhow::Result<u8> {
        u8::from_str_radix(&s[range], 16).context("invalid hex color")
    };
    match s.len() {
        6 => Ok([parse(0..2)?, parse(2..4)?, parse(4..6)?, 255]),
        8 => Ok([parse(0..2)?, parse(2..4)?, parse(4..6)?, parse(6..8)?]),
        _ => anyhow::bail!("background must be RRGGBB or RRGGBBAA hex"),
    }
}
