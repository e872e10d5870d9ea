//! Command line input handling

use stable_sorts::algorithms::*;
use stable_sorts::data;

/// Command line arguments
#[derive(clap::Parser)]
#[command(author, version, about)]
pub struct Args {
    /// The sorting algorithm to run
    #[arg()]
    pub algorithm: Algorithm,
    /// The data type to use for sorting
    #[arg()]
    pub data: DataType,
    /// The algorithm variant, use `-v=-1` to print available options
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub variant: isize,
    /// The number of runs to do
    #[arg(short, long, default_value_t = 1_000)]
    pub runs: usize,
    /// The size of the slices to sort
    #[arg(short, long, default_value_t = 1_000_000)]
    pub size: usize,
    /// Seed for the rng
    #[arg(long)]
    pub seed: Option<u64>,
    /// The output file to write the samples to
    pub output: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Algorithm {
    /// The default sort in [`std`]
    Std,
    /// Insertionsort
    Insertionsort,
    /// Timsort
    Timsort,
    /// Spin sort
    Spinsort,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match clap::ValueEnum::to_possible_value(self) {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

macro_rules! declare_variants {
    (
        $name:ident {
            $(
                $top_algorithm:pat => [
                    $(
                        $variant:ty
                    ),*
                    $(,)?
                ]
            ),*
            $(,)?
        }
    ) => {
        pub struct $name;

        impl $name {
            pub fn variants(algorithm: Algorithm) -> impl Iterator<Item = String> {
                let mut variants = Vec::new();
                declare_variants! { @match_algorithm
                    algorithm => Variant
                    ($(
                        $top_algorithm => [
                            $($variant),*
                        ]
                    ),*)
                    {
                        variants.push(<Variant as Sort>::display())
                    }
                }
                variants.into_iter()
            }

            pub fn sorter<T: Ord>(algorithm: Algorithm, variant: usize) -> Option<fn(&mut [T])> {
                let mut index = 0;

                declare_variants! { @match_algorithm
                    algorithm => Variant
                    ($(
                        $top_algorithm => [
                            $($variant),*
                        ]
                    ),*)
                    {
                        if variant == index {
                            return Some(<Variant as Sort>::sort);
                        } else {
                            index += 1;
                        }
                    }
                }

                None
            }

            pub fn is_stable(algorithm: Algorithm, variant: usize) -> Option<bool> {
                let mut index = 0;

                declare_variants! { @match_algorithm
                    algorithm => Variant
                    ($(
                        $top_algorithm => [
                            $($variant),*
                        ]
                    ),*)
                    {
                        if variant == index {
                            return Some(<Variant as Sort>::IS_STABLE);
                        } else {
                            index += 1;
                        }
                    }
                }

                None
            }
        }
    };
    (@match_algorithm
        $alg:expr => $variant_name:ident
        ($(
            $top_algorithm:pat => [
                $($variant:ty),*
            ]
        ),*)
        $code:block
    ) => {
        match $alg {
            $(
                $top_algorithm => {
                    $(
                        {
                            type $variant_name = $variant;

                            $code
                        }
                    )*
                }
            )*
        }
    };
}

declare_variants! {
    AlgorithmVariants {
        Algorithm::Std => [
            StdSort,
            StdSort<false>,
        ],
        Algorithm::Insertionsort => [
            insertionsort::InsertionSort,
            insertionsort::InsertionSort<true>,
        ],
        Algorithm::Timsort => [
            timsort::TimSort,
            timsort::TimSort<insertionsort::InsertionSort<false>>,
            timsort::TimSort<
                timsort::DefaultInsertionSort,
                timsort::DefaultBufGuardFactory,
                64,
                { timsort::DEFAULT_MIN_GALLOP },
            >,
        ],
        Algorithm::Spinsort => [
            spinsort::SpinSort,
            spinsort::SpinSort<insertionsort::InsertionSort<false>>,
            spinsort::SpinSort<
                spinsort::DefaultInsertionSort,
                spinsort::DefaultBufGuardFactory,
                16,
                { spinsort::DEFAULT_PROBE_THRESHOLD },
                { spinsort::DEFAULT_TAIL_LIMIT },
            >,
        ],
    }
}

impl AlgorithmVariants {
    pub fn validate(algorithm: Algorithm, variant: isize) -> Option<usize> {
        let variant = usize::try_from(variant).ok()?;

        (variant < Self::variants(algorithm).count()).then_some(variant)
    }
}

/// Something to run for a single element type and data generator
pub trait Experiment {
    type Output;

    fn run<T: data::Element, D: data::Data<T>>(self) -> Self::Output;
}

macro_rules! declare_data_types {
    (
        $(
            $name:ident : $type:ty, $d_type:ty
        ),*
        $(,)?
    ) => {
        /// Available data types for sorting
        #[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
        pub enum DataType {
            $(
                $name
            ),*
        }

        impl DataType {
            /// Run `experiment` with the element type and generator of this data type
            pub fn run<E: Experiment>(self, experiment: E) -> E::Output {
                match self {
                    $(
                        DataType::$name => experiment.run::<$type, $d_type>()
                    ),*
                }
            }
        }
    };
}

declare_data_types! {
    // u32
    PermutationU32: u32, data::PermutationData,
    Uniform4U32: u32, data::UniformData<4>,
    Uniform1000U32: u32, data::UniformData<1000>,
    RandomRunsSqrtU32: u32, data::RandomRunsSqrtData,
    RandomRuns30U32: u32, data::RandomRunsConstData<30>,
    RandomRuns3000U32: u32, data::RandomRunsConstData<3000>,
    DescendingU32: u32, data::DescendingData,
    NoisyTailU32: u32, data::NoisyTailData<32>,

    // u64
    PermutationU64: u64, data::PermutationData,
    RandomRunsSqrtU64: u64, data::RandomRunsSqrtData,

    // key value pairs
    PermutationKv: data::KeyValue, data::PermutationData,
    Uniform4Kv: data::KeyValue, data::UniformData<4>,
    RandomRunsSqrtKv: data::KeyValue, data::RandomRunsSqrtData,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match clap::ValueEnum::to_possible_value(self) {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}
