use std::fs;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use metagenome_from_profile::app::{App, RunOutcome};
use metagenome_from_profile::config::BaseConfig;
use metagenome_from_profile::domain::{GenomeReusePolicy, ReferenceSource, SampleCount};
use metagenome_from_profile::error::PipelineError;
use metagenome_from_profile::options::RunOptions;
use metagenome_from_profile::output::JsonOutput;
use metagenome_from_profile::profile::ProfileFormat;
use metagenome_from_profile::references::ReferenceFetcher;
use metagenome_from_profile::resolver::{GenomeResolver, ResolutionRequest, ResolvedRun};
use metagenome_from_profile::simulator::{SimulationOutcome, SimulationRequest, Simulator};

const TEMPLATE: &str = "\
[Main]
seed = 1
output_directory = template_out/
id_to_genome_file =

[ReadSimulator]
readsim=tools/art_illumina-2.3.6/art_illumina
profile: mbarc
size = 0.1
";

const BIOM: &str = r#"{"id": null, "format": "Biological Observation Matrix 1.0.0", "shape": [3, 2], "data": []}"#;

#[derive(Default)]
struct MockResolver {
    calls: Mutex<Vec<ResolutionRequest>>,
    fail: bool,
}

impl GenomeResolver for MockResolver {
    fn resolve(
        &self,
        request: &ResolutionRequest,
        mut config: BaseConfig,
    ) -> Result<ResolvedRun, PipelineError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(PipelineError::Resolution("taxonomy lookup miss".to_string()));
        }
        let mapping = request.output_dir.join("genome_to_id.tsv");
        fs::write(mapping.as_std_path(), "Otu1\tGCF_000005845.2\n").unwrap();
        config.set("Main", "id_to_genome_file", mapping.as_str());
        config.set("community0", "genomes_total", "1");
        Ok(ResolvedRun {
            genome_count: 1,
            config,
        })
    }
}

#[derive(Default)]
struct MockSimulator {
    calls: Mutex<Vec<SimulationRequest>>,
    exit_code: i32,
}

impl Simulator for MockSimulator {
    fn launch(&self, request: &SimulationRequest) -> Result<SimulationOutcome, PipelineError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(SimulationOutcome {
            exit_code: Some(self.exit_code),
            success: self.exit_code == 0,
        })
    }
}

#[derive(Default)]
struct MockFetcher {
    urls: Mutex<Vec<String>>,
}

impl ReferenceFetcher for MockFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), PipelineError> {
        self.urls.lock().unwrap().push(url.to_string());
        fs::write(destination, "1234\tSome species\tftp://example/genome\n").unwrap();
        Ok(())
    }
}

struct Workspace {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(root.join("default_config.ini").as_std_path(), TEMPLATE).unwrap();
        fs::write(root.join("p.biom").as_std_path(), BIOM).unwrap();
        Self { _temp: temp, root }
    }

    fn options(&self) -> RunOptions {
        let mut options =
            RunOptions::new(self.root.join("p.biom"))
                .with_output_dir(&format!("{}/out/", self.root))
                .unwrap();
        options.config_template = self.root.join("default_config.ini");
        options.tmp_dir = Some(self.root.join("tmp"));
        options
    }

    fn out_dir(&self) -> Utf8PathBuf {
        self.root.join("out")
    }
}

fn read_config(path: &Utf8Path) -> BaseConfig {
    BaseConfig::parse(&fs::read_to_string(path.as_std_path()).unwrap()).unwrap()
}

#[test]
fn end_to_end_with_samples_and_seed() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.samples = Some(3);
    options.seed = Some(42);

    let resolver = MockResolver::default();
    let simulator = MockSimulator::default();
    let app = App::new(resolver, simulator, MockFetcher::default());
    let summary = app.run(&options, &JsonOutput).unwrap();

    let config_path = workspace.out_dir().join("config.ini");
    assert_eq!(summary.config_path, config_path.as_str());
    assert_eq!(summary.genome_count, 1);
    assert_eq!(summary.seed.as_deref(), Some("42"));
    assert_matches!(summary.outcome, RunOutcome::Dispatched { success: true, .. });

    let written = read_config(&config_path);
    assert_eq!(
        written.get("Main", "output_directory"),
        Some(format!("{}/out/", workspace.root).as_str())
    );
    assert_eq!(written.get("Main", "seed"), Some("42"));
    assert_eq!(written.main().seed.as_deref(), Some("42"));
}

#[test]
fn resolver_receives_options() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.samples = Some(3);
    options.seed = Some(42);

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    app.run(&options, &JsonOutput).unwrap();

    let calls = app.resolver().calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let request = &calls[0];
    assert_eq!(request.sample_count(), Some(3));
    assert_eq!(request.samples, SampleCount::Explicit(3));
    assert_eq!(request.seed, Some(42));
    assert!(request.replace());
    assert!(!request.fill_up());
    assert_eq!(request.profile, workspace.root.join("p.biom"));
    assert!(request.staging_dir.starts_with(workspace.root.join("tmp")));
}

#[test]
fn profile_sample_count_is_left_to_the_resolver() {
    let workspace = Workspace::new();
    let options = workspace.options();
    assert_eq!(options.samples, None);

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let summary = app.run(&options, &JsonOutput).unwrap();

    let calls = app.resolver().calls.lock().unwrap();
    assert_eq!(calls[0].sample_count(), None);
    assert_eq!(summary.samples, SampleCount::FromProfile(2));
}

#[test]
fn unrecognized_profile_is_passed_through() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    let table = workspace.root.join("table.biom");
    fs::write(
        table.as_std_path(),
        "# Constructed from biom file\n#OTU ID\tS1\tS2\nOtu1\t4\t0\n",
    )
    .unwrap();
    options.profile = table.clone();

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    app.run(&options, &JsonOutput).unwrap();

    let unknown = workspace.root.join("notes.txt");
    fs::write(unknown.as_std_path(), "Otu1 4 0\n").unwrap();
    options.profile = unknown.clone();
    let summary = app.run(&options, &JsonOutput).unwrap();
    assert_eq!(summary.profile_format, ProfileFormat::Unknown);
    assert_eq!(summary.samples, SampleCount::ResolverDefault);

    let calls = app.resolver().calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].profile, table);
    assert_eq!(calls[0].profile_format, ProfileFormat::BiomTsv);
    assert_eq!(calls[1].profile, unknown);
    assert_eq!(calls[1].sample_count(), None);
}

#[test]
fn negative_template_seed_is_overridden() {
    let workspace = Workspace::new();
    fs::write(
        workspace.root.join("default_config.ini").as_std_path(),
        TEMPLATE.replace("seed = 1", "seed = -1"),
    )
    .unwrap();
    let mut options = workspace.options();
    options.seed = Some(5);

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let summary = app.run(&options, &JsonOutput).unwrap();

    assert_eq!(summary.seed.as_deref(), Some("5"));
    let written = read_config(&workspace.out_dir().join("config.ini"));
    assert_eq!(written.get("Main", "seed"), Some("5"));
    assert_eq!(app.resolver().calls.lock().unwrap()[0].seed, Some(5));
}

#[test]
fn simulator_gets_config_path_and_debug_flag() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.debug = true;

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    app.run(&options, &JsonOutput).unwrap();

    let calls = app.simulator().calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![SimulationRequest {
            config_path: workspace.out_dir().join("config.ini"),
            debug: true,
        }]
    );
}

#[test]
fn dry_run_writes_config_without_simulating() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.dry_run = true;

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let summary = app.run(&options, &JsonOutput).unwrap();

    assert_matches!(summary.outcome, RunOutcome::DryRun);
    assert!(workspace.out_dir().join("config.ini").as_std_path().is_file());
    assert!(workspace.out_dir().join("genome_to_id.tsv").as_std_path().is_file());
    assert!(app.simulator().calls.lock().unwrap().is_empty());
}

#[test]
fn template_keys_survive_and_seed_is_kept_without_override() {
    let workspace = Workspace::new();
    let options = workspace.options();

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let summary = app.run(&options, &JsonOutput).unwrap();
    assert_eq!(summary.seed.as_deref(), Some("1"));

    let content = fs::read_to_string(workspace.out_dir().join("config.ini").as_std_path()).unwrap();
    assert!(content.contains("\n[ReadSimulator]\nreadsim=tools/art_illumina-2.3.6/art_illumina\nprofile: mbarc\nsize = 0.1\n"));
    assert!(content.contains("seed = 1\n"));

    let written = read_config(&workspace.out_dir().join("config.ini"));
    assert_eq!(
        written.get("Main", "id_to_genome_file"),
        Some(workspace.out_dir().join("genome_to_id.tsv").as_str())
    );
    assert_eq!(written.get("community0", "genomes_total"), Some("1"));
}

#[test]
fn resolution_failure_leaves_no_config() {
    let workspace = Workspace::new();
    let options = workspace.options();

    let app = App::new(
        MockResolver {
            fail: true,
            ..MockResolver::default()
        },
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let err = app.run(&options, &JsonOutput).unwrap_err();

    assert_matches!(err, PipelineError::Resolution(_));
    assert!(workspace.out_dir().as_std_path().is_dir());
    assert!(!workspace.out_dir().join("config.ini").as_std_path().exists());
    assert!(app.simulator().calls.lock().unwrap().is_empty());
}

#[test]
fn unreadable_profile_fails_before_output_dir() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.profile = workspace.root.join("missing.biom");

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    let err = app.run(&options, &JsonOutput).unwrap_err();

    assert_matches!(err, PipelineError::ProfileRead { .. });
    assert!(!workspace.out_dir().as_std_path().exists());
    assert!(app.resolver().calls.lock().unwrap().is_empty());
}

#[test]
fn remote_references_are_staged_locally() {
    let workspace = Workspace::new();
    let mut options = workspace.options();
    options.additional_references = Some(
        "https://example.org/lists/extra_refs.tsv"
            .parse::<ReferenceSource>()
            .unwrap(),
    );
    options.policy = GenomeReusePolicy::FillUp;

    let app = App::new(
        MockResolver::default(),
        MockSimulator::default(),
        MockFetcher::default(),
    );
    app.run(&options, &JsonOutput).unwrap();

    assert_eq!(
        *app.fetcher().urls.lock().unwrap(),
        vec!["https://example.org/lists/extra_refs.tsv".to_string()]
    );
    let calls = app.resolver().calls.lock().unwrap();
    let staged = calls[0].additional_references.clone().unwrap();
    assert_eq!(staged.file_name(), Some("extra_refs.tsv"));
    assert!(staged.starts_with(&calls[0].staging_dir));
    assert!(calls[0].fill_up());
    // staging directory is gone once the run is over
    assert!(!staged.as_std_path().exists());
}

#[test]
fn failed_simulation_is_reported_not_raised() {
    let workspace = Workspace::new();
    let options = workspace.options();

    let app = App::new(
        MockResolver::default(),
        MockSimulator {
            exit_code: 4,
            ..MockSimulator::default()
        },
        MockFetcher::default(),
    );
    let summary = app.run(&options, &JsonOutput).unwrap();

    assert_matches!(
        summary.outcome,
        RunOutcome::Dispatched {
            exit_code: Some(4),
            success: false
        }
    );
}
