//! terrain-bvh CLI - Inspect and sculpt heightmap terrain.

use anyhow::{bail, Context};
use std::env;
use std::path::Path;
use terrain_bvh::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "chrome-trace")]
type TraceGuard = Option<tracing_chrome::FlushGuard>;
#[cfg(not(feature = "chrome-trace"))]
type TraceGuard = ();

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level: Option<&str> = None;
    let mut config: Option<&str> = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = Some("debug"),
            "-vv" | "--trace" => level = Some("trace"),
            "-q" | "--quiet" => level = Some("error"),
            "-c" | "--config" => match iter.next() {
                Some(path) => config = Some(path),
                None => {
                    eprintln!("Error: --config needs a settings file");
                    std::process::exit(1);
                }
            },
            _ => filtered_args.push(arg),
        }
    }

    let _guard = init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => load_settings(config).and_then(|s| cmd_info(&s, &filtered_args[1..])),
        "check" | "c" => load_settings(config).and_then(|s| cmd_check(&s, &filtered_args[1..])),
        "pick" | "p" => load_settings(config).and_then(|s| cmd_pick(&s, &filtered_args[1..])),
        "sculpt" | "s" => load_settings(config).and_then(|s| cmd_sculpt(&s, &filtered_args[1..])),
        "flat" | "f" => load_settings(config).and_then(|s| cmd_flat(&s, &filtered_args[1..])),
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
}

/// Install the fmt subscriber; `-v`/`-vv`/`-q` override `RUST_LOG`.
///
/// With `TERRAIN_BVH_TRACE=1`, spans are also written to `trace.json`.
#[cfg(feature = "chrome-trace")]
fn init_tracing(level: Option<&str>) -> TraceGuard {
    let registry = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer());

    if env::var("TERRAIN_BVH_TRACE").ok().as_deref() != Some("1") {
        let _ = registry.try_init();
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();
    registry.with(chrome_layer).try_init().ok().map(|_| guard)
}

/// Install the fmt subscriber; `-v`/`-vv`/`-q` override `RUST_LOG`.
#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(level: Option<&str>) -> TraceGuard {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer())
        .try_init();
}

fn load_settings(path: Option<&str>) -> anyhow::Result<TerrainSettings> {
    match path {
        Some(path) => {
            tracing::debug!("Loading settings: {}", path);
            TerrainSettings::load(path).with_context(|| format!("failed to load settings {}", path))
        }
        None => Ok(TerrainSettings::default()),
    }
}

fn load_terrain(settings: &TerrainSettings, path: &str) -> anyhow::Result<Terrain> {
    tracing::info!("Loading heightmap: {}", path);
    Terrain::load_raw(path, settings).with_context(|| format!("failed to load heightmap {}", path))
}

fn require(args: &[&str], n: usize, usage: &str) -> anyhow::Result<()> {
    if args.len() < n {
        bail!("missing arguments\nUsage: terrain-bvh {}", usage);
    }
    Ok(())
}

fn parse_f32(s: &str) -> anyhow::Result<f32> {
    s.parse::<f32>().with_context(|| format!("expected a number, got '{}'", s))
}

fn cmd_info(settings: &TerrainSettings, args: &[&str]) -> anyhow::Result<()> {
    require(args, 1, "info <heightmap.raw>")?;
    let terrain = load_terrain(settings, args[0])?;
    let bvh = terrain.bvh();
    let stats = bvh.stats();
    let bounds = bvh.root_bounds();

    println!("Heightmap: {}", args[0]);
    println!(
        "Grid:      {0}x{0} vertices, step {1}",
        terrain.resolution(),
        terrain.step()
    );
    println!("Bounds:    {:?}", bounds);
    println!();
    println!("BVH:");
    println!("  Triangles:    {}", stats.triangle_count);
    println!("  Nodes:        {} / {} slots", stats.node_count, bvh.pool_capacity());
    println!("  Leaves:       {}", stats.leaf_count);
    println!("  Max depth:    {}", stats.max_depth);
    println!("  Max leaf:     {}", stats.max_leaf_size);
    println!("  Degenerate:   {}", stats.degenerate_splits);
    println!("  Depth capped: {}", stats.capped_leaves);
    println!("  Build time:   {:.2} ms", stats.build_time_ms);
    Ok(())
}

fn cmd_check(settings: &TerrainSettings, args: &[&str]) -> anyhow::Result<()> {
    require(args, 1, "check <heightmap.raw>")?;
    let mut terrain = load_terrain(settings, args[0])?;
    terrain.bvh().validate(&terrain).context("freshly built BVH is invalid")?;

    terrain.refit()?;
    terrain.bvh().validate(&terrain).context("refit BVH is invalid")?;

    println!("{}: ok ({} nodes)", args[0], terrain.bvh().pool_ptr());
    Ok(())
}

fn cmd_pick(settings: &TerrainSettings, args: &[&str]) -> anyhow::Result<()> {
    require(args, 7, "pick <heightmap.raw> <ox> <oy> <oz> <dx> <dy> <dz>")?;
    let terrain = load_terrain(settings, args[0])?;

    let v: Vec<f32> = args[1..7].iter().map(|s| parse_f32(s)).collect::<anyhow::Result<_>>()?;
    let origin = Vec3::new(v[0], v[1], v[2]);
    let direction = Vec3::new(v[3], v[4], v[5]);
    if direction.length_squared() == 0.0 {
        bail!("ray direction must be non-zero");
    }

    match terrain.intersect(&Ray::new(origin, direction)) {
        Some(hit) => println!(
            "hit {:.4} {:.4} {:.4} (t = {:.4}, triangle {})",
            hit.point.x, hit.point.y, hit.point.z, hit.t, hit.triangle
        ),
        None => println!("miss"),
    }
    Ok(())
}

fn cmd_sculpt(settings: &TerrainSettings, args: &[&str]) -> anyhow::Result<()> {
    let usage = "sculpt <heightmap.raw> <x> <z> [--lower] [--out <file>]";
    require(args, 3, usage)?;

    let mut lower = false;
    let mut out = args[0];
    let mut rest = args[3..].iter();
    while let Some(&arg) = rest.next() {
        match arg {
            "--lower" | "-l" => lower = true,
            "--out" | "-o" => match rest.next() {
                Some(&path) => out = path,
                None => bail!("--out needs a file\nUsage: terrain-bvh {}", usage),
            },
            other => bail!("unexpected argument '{}'\nUsage: terrain-bvh {}", other, usage),
        }
    }

    let mut terrain = load_terrain(settings, args[0])?;
    let x = parse_f32(args[1])?;
    let z = parse_f32(args[2])?;

    // Snap the stroke to the surface with a vertical pick
    let ray = Ray::new(Vec3::new(x, settings.max_height() + 1.0, z), Vec3::NEG_Y);
    let Some(click) = terrain.pick(&ray) else {
        bail!("({}, {}) is outside the terrain", x, z);
    };

    terrain.manipulate(click, &settings.brush, !lower)?;
    tracing::info!(
        "{} at ({:.2}, {:.2}, {:.2})",
        if lower { "Lowered" } else { "Raised" },
        click.x,
        click.y,
        click.z
    );

    if Path::new(out).exists() && out != args[0] {
        tracing::warn!("Overwriting {}", out);
    }
    terrain.save_raw(out).with_context(|| format!("failed to write {}", out))?;
    println!("Wrote {}", out);
    Ok(())
}

fn cmd_flat(settings: &TerrainSettings, args: &[&str]) -> anyhow::Result<()> {
    require(args, 1, "flat <out.raw>")?;
    let terrain = Terrain::flat(settings)?;
    terrain.save_raw(args[0]).with_context(|| format!("failed to write {}", args[0]))?;
    println!(
        "Wrote {0}x{0} flat heightmap to {1}",
        terrain.resolution(),
        args[0]
    );
    Ok(())
}

fn version_string() -> String {
    format!(
        "terrain-bvh {} ({}, built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("TERRAIN_BVH_BUILD_PROFILE"),
        env!("TERRAIN_BVH_BUILD_DATE"),
        env!("TERRAIN_BVH_BUILD_TIME")
    )
}

fn print_version() {
    println!("{}", version_string());
}

fn print_help() {
    println!("terrain-bvh - Heightmap terrain BVH toolkit");
    println!();
    println!("USAGE:");
    println!("    terrain-bvh [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <raw>                      Build the BVH and show statistics");
    println!("    c, check  <raw>                      Build, refit and validate the BVH");
    println!("    p, pick   <raw> ox oy oz dx dy dz    Cast a ray, print the nearest hit");
    println!("    s, sculpt <raw> x z [--lower] [--out <file>]");
    println!("                                         Apply one brush stroke at (x, z)");
    println!("    f, flat   <out>                      Write a flat heightmap");
    println!("    version                              Show version and build date");
    println!("    h, help                              Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <file>  Terrain settings (JSON)");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    terrain-bvh flat terrain.raw                  # 128x128 flat terrain");
    println!("    terrain-bvh sculpt terrain.raw 10 -4          # Raise at (10, -4)");
    println!("    terrain-bvh pick terrain.raw 0 100 0 0 -1 0   # Straight down at the centre");
    println!("    terrain-bvh -v -c big.json info terrain.raw   # Verbose, custom settings");
    println!();
    println!("NOTES:");
    println!("    - Heightmaps are 8-bit .raw files, resolution x resolution bytes");
    println!("    - RUST_LOG applies when no verbosity flag is given");
    #[cfg(feature = "chrome-trace")]
    println!("    - TERRAIN_BVH_TRACE=1 writes a Chrome trace to trace.json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_carries_build_stamp() {
        let version = version_string();
        assert!(version.starts_with(concat!("terrain-bvh ", env!("CARGO_PKG_VERSION"))));
        assert!(version.contains(env!("TERRAIN_BVH_BUILD_PROFILE")));
        assert!(!env!("TERRAIN_BVH_BUILD_PROFILE").is_empty());
    }

    #[test]
    fn test_require_reports_usage() {
        let err = require(&["a.raw"], 3, "sculpt <heightmap.raw> <x> <z>").unwrap_err();
        assert!(err.to_string().contains("Usage: terrain-bvh sculpt"));
        assert!(require(&["a.raw", "1", "2"], 3, "sculpt").is_ok());
    }
}
