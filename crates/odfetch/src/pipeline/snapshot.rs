//! Directory-listing driven fetching of every file matching a pattern

use super::FetchRun;
use crate::config::FetchConfig;
use crate::diagnostics::{self, DiagnosticSink};
use crate::error::PipelineError;
use crate::fetch::{Fetch, RemoteFetcher};
use crate::filter::{FilterMode, PatternFilter};
use crate::listing::{pattern_dir, DirectoryListing, FtpLister};
use crate::resolve_url;
use std::sync::Arc;
use tracing::info;

/// Lists the pattern's directory and fetches each matching file
pub struct SnapshotPipeline<F: Fetch = RemoteFetcher, L: DirectoryListing = FtpLister> {
    fetcher: F,
    lister: L,
    base_url: String,
    directory: String,
    filter: PatternFilter,
    sink: Arc<dyn DiagnosticSink>,
}

impl SnapshotPipeline<RemoteFetcher, FtpLister> {
    /// Pipeline listing over FTP and fetching with a [`RemoteFetcher`]
    pub fn new(config: &FetchConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let fetcher = RemoteFetcher::new(config)?;
        let lister = FtpLister::new(config)?;
        Self::with_parts(fetcher, lister, config)
    }
}

impl<F: Fetch, L: DirectoryListing> SnapshotPipeline<F, L> {
    pub fn with_parts(fetcher: F, lister: L, config: &FetchConfig) -> Result<Self, PipelineError> {
        let filter = PatternFilter::new(&config.pattern, FilterMode::Names)
            .map_err(|e| PipelineError::config(format!("invalid pattern: {}", e)))?;
        Ok(Self {
            fetcher,
            lister,
            base_url: config.base_url.clone(),
            directory: pattern_dir(&config.pattern).to_string(),
            filter,
            sink: diagnostics::noop(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Candidate paths, relative to the base URL, that match the pattern
    ///
    /// Listing entries are reduced to their last path segment, then placed
    /// under the pattern's directory before matching.
    pub fn candidates(&self) -> Result<Vec<String>, PipelineError> {
        let names = self.lister.list().map_err(PipelineError::Listing)?;
        let listed = names.len();

        let candidates: Vec<String> = names
            .iter()
            .map(|name| name.trim_end_matches('/'))
            .map(|name| name.rsplit('/').next().unwrap_or(name))
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(|name| {
                if self.directory.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", self.directory, name)
                }
            })
            .filter(|candidate| self.filter.is_match(candidate))
            .collect();

        info!(
            pattern = %self.filter.pattern(),
            "{} of {} listed names match",
            candidates.len(),
            listed
        );
        Ok(candidates)
    }

    /// List the directory and select the targets
    ///
    /// A listing failure ends the run here. The returned run fetches the
    /// selected files lazily.
    pub fn start(&self) -> Result<FetchRun<'_, F>, PipelineError> {
        let targets = self
            .candidates()?
            .iter()
            .map(|candidate| resolve_url(&self.base_url, candidate))
            .collect();
        Ok(FetchRun::new(&self.fetcher, targets, self.sink.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::decode::archive::tests::zip_of;
    use crate::diagnostics::CollectingSink;
    use crate::error::{ErrorKind, FetchError};
    use crate::pipeline::tests::MapFetcher;

    const BASE: &str = "https://opendata.example.org/climate/10_minutes/wind/recent";

    /// A listing whose directory cannot be entered
    struct UnreachableDirectory;

    impl DirectoryListing for UnreachableDirectory {
        fn list(&self) -> crate::error::Result<Vec<String>> {
            Err(FetchError::Directory {
                path: "/climate/10_minutes/wind/recent".to_string(),
                message: "550 Failed to change directory".to_string(),
            })
        }
    }

    fn config(pattern: &str) -> FetchConfig {
        FetchConfig::builder().base_url(BASE).pattern(pattern).build()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fetches_every_match_and_skips_broken_ones() {
        let listing = names(&["a.json", "b.json", "c.json", "d.json", "e.json", "readme.txt"]);
        let fetcher = MapFetcher::default()
            .with(&format!("{}/a.json", BASE), br#"{"n":1}"#)
            .with(&format!("{}/b.json", BASE), br#"{"n":2}"#)
            .with(&format!("{}/c.json", BASE), b"{oops")
            .with(&format!("{}/d.json", BASE), br#"{"n":4}"#)
            .with(&format!("{}/e.json", BASE), br#"{"n":5}"#);
        let sink = Arc::new(CollectingSink::new());
        let pipeline = SnapshotPipeline::with_parts(fetcher, listing, &config(r".*\.json"))
            .unwrap()
            .with_sink(sink.clone());

        let resources: Vec<_> = pipeline.start().unwrap().collect();

        let summary: Vec<_> = resources
            .iter()
            .map(|r| (r.index, r.base_name.as_str(), r.content.as_json().unwrap()["n"].clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "a", serde_json::json!(1)),
                (1, "b", serde_json::json!(2)),
                (2, "d", serde_json::json!(4)),
                (3, "e", serde_json::json!(5)),
            ]
        );
        assert_eq!(sink.kinds(), vec![ErrorKind::Parse]);
        assert_eq!(sink.entries()[0].subject, format!("{}/c.json", BASE));
    }

    #[test]
    fn test_unreachable_directory_is_fatal() {
        let pipeline =
            SnapshotPipeline::with_parts(MapFetcher::default(), UnreachableDirectory, &config(".*"))
                .unwrap();
        match pipeline.start() {
            Err(PipelineError::Listing(source)) => assert_eq!(source.kind(), ErrorKind::Directory),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("run should not start without a listing"),
        }
        assert!(pipeline.fetcher().calls().is_empty());
    }

    #[test]
    fn test_no_matches_is_an_empty_run() {
        let pipeline = SnapshotPipeline::with_parts(
            MapFetcher::default(),
            names(&["a.csv", "b.csv"]),
            &config(r".*\.json"),
        )
        .unwrap();
        let mut run = pipeline.start().unwrap();
        assert_eq!(run.remaining(), 0);
        assert!(run.next().is_none());
    }

    #[test]
    fn test_candidates_sit_under_pattern_directory() {
        let listing = names(&[
            "/weather/nwp/icon-d2/grib/03/t_2m/x_icosahedral_t_2m.grib2.bz2",
            "/weather/nwp/icon-d2/grib/03/t_2m/x_regular-lat-lon_t_2m.grib2.bz2",
            "..",
        ]);
        let config = FetchConfig::builder()
            .base_url("https://opendata.example.org/weather/nwp/")
            .pattern("icon-d2/grib/03/t_2m/.*_icosahedral_.*")
            .build();
        let pipeline =
            SnapshotPipeline::with_parts(MapFetcher::default(), listing, &config).unwrap();

        assert_eq!(
            pipeline.candidates().unwrap(),
            vec!["icon-d2/grib/03/t_2m/x_icosahedral_t_2m.grib2.bz2"]
        );
        let run = pipeline.start().unwrap();
        assert_eq!(run.remaining(), 1);
    }

    #[test]
    fn test_archive_member_decoded() {
        let listing = names(&["10minutenwerte_wind_00044_akt.zip"]);
        let url = format!("{}/10minutenwerte_wind_00044_akt.zip", BASE);
        let member = b"STATIONS_ID;MESS_DATUM\n44;202208050000";
        let fetcher = MapFetcher::default()
            .with(&url, &zip_of(&[("produkt_zehn_min_ff_00044.txt", member)]));
        let pipeline = SnapshotPipeline::with_parts(
            fetcher,
            listing,
            &config(r"10minutenwerte_wind_\d*_akt\.zip"),
        )
        .unwrap();

        let resources: Vec<_> = pipeline.start().unwrap().collect();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].base_name, "10minutenwerte_wind_00044_akt");
        assert_eq!(resources[0].url, url);
        assert_eq!(
            resources[0].content.as_text(),
            Some("STATIONS_ID;MESS_DATUM\n44;202208050000")
        );
    }
}
