use std::process::ExitCode;

use clap::{Parser, Subcommand};
use half::f16;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use xew_core::{OperatorKind, Shape, TensorArg, TensorArgMut, XewError};
use xew_ops::resolve_aligned;
use xew_xpu::{
    DeviceGeneration, KernelDescriptor, KernelRegistry, XpuContext, default_generation,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "xew")]
#[command(about = "XPU broadcast elementwise development CLI")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Launch a few kernels through the registry and print the results.
    Smoke,
    /// List the registered elementwise kernels.
    Kernels {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Device generation (xpu1 or xpu2). Defaults to XEW_DEVICE_GENERATION.
        #[arg(long)]
        generation: Option<DeviceGeneration>,
    },
    /// Show how two shapes are aligned for a broadcast launch.
    Resolve {
        /// Shape of X, comma separated.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        x: Vec<i64>,
        /// Shape of Y, comma separated.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        y: Vec<i64>,
        /// Output rank. Defaults to the larger input rank.
        #[arg(long)]
        out_rank: Option<usize>,
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        axis: i32,
    },
}

#[derive(Serialize)]
struct KernelRow {
    op: String,
    dtype: String,
    target: String,
    precision: String,
    layout: String,
    alias: &'static str,
    x: String,
    y: String,
    out: String,
}

impl From<&KernelDescriptor> for KernelRow {
    fn from(d: &KernelDescriptor) -> Self {
        Self {
            op: d.op.to_string(),
            dtype: d.dtype.to_string(),
            target: d.target.to_string(),
            precision: d.precision.to_string(),
            layout: d.layout.to_string(),
            alias: d.alias,
            x: d.x.to_string(),
            y: d.y.to_string(),
            out: d.out.to_string(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = match args.cmd {
        Cmd::Smoke => smoke(),
        Cmd::Kernels { json, generation } => {
            kernels(json, generation.unwrap_or_else(default_generation))
        }
        Cmd::Resolve {
            x,
            y,
            out_rank,
            axis,
        } => resolve(x, y, out_rank, axis),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> CliResult {
    let ctx = XpuContext::with_default_generation()?;
    let generation = ctx.generation();
    let registry = KernelRegistry::new(generation)?;
    println!("Generation: {generation}");
    println!("Kernels: {}\n", registry.len());

    // [2, 1, 4] + [3, 4] -> [2, 3, 4]
    let (xs, ys, os) = (
        Shape::new(vec![2, 1, 4]),
        Shape::new(vec![3, 4]),
        Shape::new(vec![2, 3, 4]),
    );
    let x: Vec<f32> = (0..8).map(|v| v as f32 * 10.0).collect();
    let y: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let mut out = vec![0.0f32; 24];
    registry.launch(
        &ctx,
        OperatorKind::Add,
        TensorArg::new(&x, &xs),
        TensorArg::new(&y, &ys),
        TensorArgMut::new(&mut out, &os),
        -1,
    )?;
    println!("add {xs} + {ys} = {out:?}");

    let vs = Shape::new(vec![4]);
    let xi = [7, -7, 7, -7];
    let yi = [3, 3, -3, -3];
    let mut oi = [0i32; 4];
    registry.launch(
        &ctx,
        OperatorKind::Mod,
        TensorArg::new(&xi, &vs),
        TensorArg::new(&yi, &vs),
        TensorArgMut::new(&mut oi, &vs),
        -1,
    )?;
    println!("mod {xi:?} % {yi:?} = {oi:?}");

    if generation != DeviceGeneration::Xpu1 {
        let xh = [f16::from_f32(7.5), f16::from_f32(-7.5)];
        let yh = [f16::from_f32(2.0)];
        let mut oh = [f16::ZERO; 2];
        registry.launch(
            &ctx,
            OperatorKind::FloorDiv,
            TensorArg::new(&xh, &Shape::new(vec![2])),
            TensorArg::new(&yh, &Shape::new(vec![1])),
            TensorArgMut::new(&mut oh, &Shape::new(vec![2])),
            -1,
        )?;
        let oh: Vec<f32> = oh.iter().map(|v| v.to_f32()).collect();
        println!("floordiv [7.5, -7.5] // [2] (f16) = {oh:?}");
    }

    println!("\n{} launches completed.", ctx.launch_count());
    Ok(())
}

fn kernels(json: bool, generation: DeviceGeneration) -> CliResult {
    let registry = KernelRegistry::new(generation)?;
    let rows: Vec<KernelRow> = registry.descriptors().map(KernelRow::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{} kernels on {generation}", rows.len());
    for r in &rows {
        println!(
            "{:<22} {:<4} {:<6} {:<30} X={} Y={} Out={}",
            r.op, r.dtype, r.precision, r.alias, r.x, r.y, r.out
        );
    }
    Ok(())
}

fn resolve(x: Vec<i64>, y: Vec<i64>, out_rank: Option<usize>, axis: i32) -> CliResult {
    let (x, y) = (Shape::new(x), Shape::new(y));
    let out_rank = out_rank.unwrap_or(x.ndim().max(y.ndim()));
    let aligned = resolve_aligned(out_rank, &x, &y, axis)?;
    println!("x:   {x} -> {:?}", aligned.x.as_slice());
    println!("y:   {y} -> {:?}", aligned.y.as_slice());
    let numel = aligned.output_numel().ok_or_else(|| {
        XewError::ElementCountOverflow(Shape::new(aligned.output_dims().to_vec()))
    })?;
    println!("out: {:?} ({numel} elements)", aligned.output_dims().as_slice());
    Ok(())
}
