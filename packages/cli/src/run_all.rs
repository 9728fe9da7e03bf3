//! Per-city batch run: collect, analyze and report each configured city
//! on its own, continuing past failures.

use std::path::PathBuf;
use std::time::Instant;

use outlet_map_analytics::pipeline::{PipelineOptions, run_pipeline};
use outlet_map_cli_utils::{IndicatifProgress, MultiProgress};
use outlet_map_config::AnalysisConfig;
use outlet_map_location_models::OrgType;
use outlet_map_report::write_reports;
use outlet_map_source::combine::collect_table;
use outlet_map_source::file_source::FileSource;
use outlet_map_source::progress::NullProgress;

pub enum CityOutcome {
    Succeeded {
        city: String,
        records: usize,
        reports: PathBuf,
    },
    Failed {
        city: String,
        error: String,
    },
}

pub struct RunSummary {
    pub outcomes: Vec<CityOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CityOutcome::Succeeded { .. }))
            .count()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    pub fn print(&self) {
        println!(
            "Cities: {} succeeded, {} failed",
            self.succeeded(),
            self.outcomes.len() - self.succeeded()
        );
        for outcome in &self.outcomes {
            match outcome {
                CityOutcome::Succeeded {
                    city,
                    records,
                    reports,
                } => println!("  OK   {city}: {records} records -> {}", reports.display()),
                CityOutcome::Failed { city, error } => println!("  FAIL {city}: {error}"),
            }
        }
    }
}

/// Runs every configured city, or only `options.city` when set. Each city
/// writes into its own `output_dir/<city code>` directory.
pub fn run(config: &AnalysisConfig, options: &PipelineOptions, multi: &MultiProgress) -> RunSummary {
    let cities = options
        .city
        .clone()
        .map_or_else(|| config.cities.clone(), |city| vec![city]);
    let source = FileSource::new(config.data_dir.clone(), config.city_codes.clone());

    let progress = IndicatifProgress::steps_bar(multi, "Cities", cities.len() as u64);
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(cities.len());

    for city in cities {
        progress.set_message(city.clone());
        let outcome = match run_city(&source, &city, config, options) {
            Ok((records, reports)) => CityOutcome::Succeeded {
                city,
                records,
                reports,
            },
            Err(e) => {
                log::error!("Failed to analyze {city}: {e}");
                CityOutcome::Failed {
                    city,
                    error: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);
        progress.inc(1);
    }

    progress.finish(format!(
        "Processed {} cities in {:.1}s",
        outcomes.len(),
        start.elapsed().as_secs_f64()
    ));
    RunSummary { outcomes }
}

fn run_city(
    source: &FileSource,
    city: &str,
    config: &AnalysisConfig,
    options: &PipelineOptions,
) -> Result<(usize, PathBuf), Box<dyn std::error::Error>> {
    let table = collect_table(source, &[city.to_string()], OrgType::all(), &NullProgress)?;
    if table.is_empty() {
        return Err(format!("no records found in {}", source.dir().display()).into());
    }

    let options = city_options(options, config, city);
    let result = run_pipeline(&table, config, &options, &NullProgress)?;

    let dir = config.output_dir.join(config.city_code(city));
    let paths = write_reports(&result, &config.map, &dir)?;
    log::info!("{city}: {} report files written", paths.written().len());

    Ok((table.len(), dir))
}

/// Options scoped to `city`, with a model cache artifact of its own so
/// one city's model is never served for another.
fn city_options(options: &PipelineOptions, config: &AnalysisConfig, city: &str) -> PipelineOptions {
    let mut options = options.clone().with_city(Some(city.to_string()));
    options.cache = options.cache.scoped(&config.city_code(city));
    options
}

#[cfg(test)]
mod tests {
    use outlet_map_analytics::efficiency::CachePolicy;

    use super::*;

    fn ok(city: &str) -> CityOutcome {
        CityOutcome::Succeeded {
            city: city.to_string(),
            records: 3,
            reports: PathBuf::from("reports").join(city),
        }
    }

    fn failed(city: &str) -> CityOutcome {
        CityOutcome::Failed {
            city: city.to_string(),
            error: "missing export".to_string(),
        }
    }

    #[test]
    fn counts_successes() {
        let summary = RunSummary {
            outcomes: vec![ok("msk"), failed("spb"), ok("kzn")],
        };
        assert_eq!(summary.succeeded(), 2);
        assert!(!summary.all_failed());
    }

    #[test]
    fn all_failed_requires_at_least_one_city() {
        assert!(!RunSummary { outcomes: vec![] }.all_failed());
        assert!(
            RunSummary {
                outcomes: vec![failed("spb")]
            }
            .all_failed()
        );
    }

    #[test]
    fn each_city_gets_its_own_model_cache() {
        let mut config = AnalysisConfig::default();
        config.model_cache_path = PathBuf::from("models").join("efficiency.msgpack");
        config
            .city_codes
            .insert("Москва".to_string(), "msk".to_string());
        let options = PipelineOptions::new(&config, false);

        let moscow = city_options(&options, &config, "Москва");
        assert_eq!(moscow.city.as_deref(), Some("Москва"));
        assert_eq!(
            moscow.cache,
            CachePolicy::Use(PathBuf::from("models").join("efficiency_msk.msgpack"))
        );

        let refreshed = city_options(&PipelineOptions::new(&config, true), &config, "Омск");
        assert_eq!(
            refreshed.cache,
            CachePolicy::Refresh(PathBuf::from("models").join("efficiency_oms.msgpack"))
        );
    }
}
