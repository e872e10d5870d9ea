use std::io::Write as _;

use clap::Parser as _;
use rand::SeedableRng as _;

use stable_sorts::data;

mod cli;

/// Program entry point
fn main() -> std::io::Result<()> {
    let cli::Args {
        algorithm,
        data,
        variant,
        runs,
        size,
        seed,
        output,
    } = cli::Args::parse();

    let Some(variant) = cli::AlgorithmVariants::validate(algorithm, variant) else {
        println!("Available variants of {algorithm}:");
        for (index, name) in cli::AlgorithmVariants::variants(algorithm).enumerate() {
            println!("{index:>3}: {name}");
        }
        return Ok(());
    };

    let name = cli::AlgorithmVariants::variants(algorithm)
        .nth(variant)
        .unwrap_or_default();
    let stable = cli::AlgorithmVariants::is_stable(algorithm, variant).unwrap_or_default();

    println!("Running measurements for the following algorithm:\n{name} (stable: {stable})");
    println!("Runs: {runs}, Slice size: {size}, Data type: {data}");

    let mut rng = match seed {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => {
            println!("No seed provided, generating one using system rng");
            rand::rngs::StdRng::from_os_rng()
        }
    };

    let Some((samples, stats)) = data.run(Measurement {
        algorithm,
        variant,
        runs,
        size,
        rng: &mut rng,
    }) else {
        unreachable!("Variant {variant} was validated");
    };

    println!("Stats (ms): {stats:?}");

    #[cfg(feature = "counters")]
    {
        use stable_sorts::algorithms::merging;

        let runs = runs as u64 + 1;
        println!(
            "Allocated elements per run: {}",
            merging::ALLOC_COUNTER.reset() / runs
        );
        println!(
            "Merged slice elements per run: {}",
            merging::MERGE_SLICE_COUNTER.reset() / runs
        );
        println!(
            "Buffered elements per run: {}",
            merging::MERGE_BUFFER_COUNTER.reset() / runs
        );
    }

    if let Some(path) = output {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
        for sample in samples {
            writeln!(writer, "{}", sample.as_nanos())?;
        }
        writer.flush()?;

        println!("Samples written to {}", path.display());
    }

    Ok(())
}

/// A time sampling experiment on one algorithm variant
///
/// - runs: The number of samples to measure
/// - size: The size of the slices to sort
/// - rng: The rng used for sampling the data
struct Measurement<'a, R> {
    algorithm: cli::Algorithm,
    variant: usize,
    runs: usize,
    size: usize,
    rng: &'a mut R,
}

impl<R: rand::Rng> cli::Experiment for Measurement<'_, R> {
    type Output = Option<(Vec<std::time::Duration>, rolling_stats::Stats<f64>)>;

    fn run<T: data::Element, D: data::Data<T>>(self) -> Self::Output {
        let Self {
            algorithm,
            variant,
            runs,
            size,
            rng,
        } = self;

        let sorter = cli::AlgorithmVariants::sorter::<T>(algorithm, variant)?;
        let mut samples = Vec::with_capacity(runs);

        let mut stats: rolling_stats::Stats<f64> = rolling_stats::Stats::new();

        let bar = indicatif::ProgressBar::new(runs as u64);

        for run in 0..=runs {
            let mut values = D::initialize(size, &mut *rng);

            let now = std::time::Instant::now();
            sorter(std::hint::black_box(&mut values));
            let elapsed = now.elapsed();

            debug_assert!(values.is_sorted(), "Slice is not sorted after algorithm run");

            // The first run only warms up caches
            if run != 0 {
                samples.push(elapsed);
                stats.update(elapsed.as_secs_f64() * 1000.0);

                bar.inc(1);
            }
        }

        bar.finish();

        Some((samples, stats))
    }
}
