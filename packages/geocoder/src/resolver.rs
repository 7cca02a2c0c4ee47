//! Multi-variant, multi-provider address search.
//!
//! The resolver walks the query variants of an address from most to least
//! specific. For each variant the providers are asked in priority order and
//! the first one with matches answers for that variant. A result precise
//! enough and ranked below `early_exit_rank` ends the search immediately;
//! otherwise the best result across every variant wins, with an
//! interpolated estimate taking precedence over coarse matches when the
//! address names a house.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use coord_map_address::{AddressStructure, variants};
use coord_map_geocoder_models::{
    GeocodeMatch, Precision, ReferencePoint, Resolution, ResolveOutcome, ResolverConfig,
    ScoredResult,
};
use coord_map_transform::wgs84_to_bd09;
use tokio::time::Instant;

use crate::interpolation::{self, EstimateContext};
use crate::{CancelToken, GeocodeError, GeocodeProvider, references, scoring};

/// Result of a cancellable resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A match or an estimate.
    Matched(ScoredResult),
    /// Every variant and fallback came up empty.
    NotFound,
    /// The token was canceled before the search finished.
    Canceled,
}

/// Resolves addresses against a fixed set of providers.
///
/// Holds no per-search state, so one resolver can serve many concurrent
/// resolutions.
pub struct GeocodeResolver {
    config: ResolverConfig,
    providers: Vec<Arc<dyn GeocodeProvider>>,
}

/// Outcome of asking the providers about one query.
enum Lookup {
    Hit(Vec<GeocodeMatch>),
    Miss,
    Canceled,
}

/// How a search phase ended.
enum Flow {
    Found(ScoredResult),
    Exhausted,
    Canceled,
}

/// Mutable state of one resolution.
struct Search {
    want_house: bool,
    best_precise: Option<ScoredResult>,
    best_any: Option<ScoredResult>,
    collected: Vec<ScoredResult>,
    attempts: usize,
    failures: usize,
    last_error: Option<GeocodeError>,
}

impl Search {
    const fn new(want_house: bool) -> Self {
        Self {
            want_house,
            best_precise: None,
            best_any: None,
            collected: Vec::new(),
            attempts: 0,
            failures: 0,
            last_error: None,
        }
    }

    /// Books one provider call. Returns the matches if there were any.
    fn record(
        &mut self,
        provider: &str,
        query: &str,
        result: Result<Vec<GeocodeMatch>, GeocodeError>,
    ) -> Option<Vec<GeocodeMatch>> {
        self.attempts += 1;
        match result {
            Ok(matches) if matches.is_empty() => {
                log::debug!("{provider}: no match for {query:?}");
                None
            }
            Ok(matches) => {
                log::debug!("{provider}: {} match(es) for {query:?}", matches.len());
                Some(matches)
            }
            Err(e) => {
                log::warn!("{provider}: query {query:?} failed: {e}");
                self.failures += 1;
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Keeps `result` if it beats what was seen so far. Returns it back
    /// when it is good enough to stop searching.
    fn offer(&mut self, result: ScoredResult, early_exit_rank: usize) -> Option<ScoredResult> {
        let precise = !self.want_house || result.precision == Precision::HouseNumber;
        if precise && result.precision_rank < early_exit_rank {
            return Some(result);
        }

        self.collected.push(result.clone());
        if precise {
            keep_better(&mut self.best_precise, result.clone());
        }
        keep_better(&mut self.best_any, result);
        None
    }

    const fn all_failed(&self) -> bool {
        self.attempts > 0 && self.failures == self.attempts
    }
}

/// Lower rank wins; equal ranks go to the higher score.
fn keep_better(slot: &mut Option<ScoredResult>, candidate: ScoredResult) {
    let better = slot.as_ref().is_none_or(|best| {
        candidate.precision_rank < best.precision_rank
            || (candidate.precision_rank == best.precision_rank && candidate.score > best.score)
    });
    if better {
        *slot = Some(candidate);
    }
}

/// Spaces the starts of consecutive calls to one provider by `gap`, however
/// many of them are in flight.
struct Pacer {
    gap: Duration,
    next: Mutex<Instant>,
}

impl Pacer {
    fn new(gap: Duration) -> Self {
        Self {
            gap,
            next: Mutex::new(Instant::now()),
        }
    }

    /// Reserves the next start slot and sleeps until it.
    async fn wait(&self) {
        if self.gap.is_zero() {
            return;
        }
        let now = Instant::now();
        let at = {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let at = (*next).max(now);
            *next = at + self.gap;
            at
        };
        if at > now {
            tokio::time::sleep_until(at).await;
        }
    }
}

impl GeocodeResolver {
    /// Creates a resolver querying `providers` in the given order.
    #[must_use]
    pub fn new(config: ResolverConfig, providers: Vec<Arc<dyn GeocodeProvider>>) -> Self {
        Self { config, providers }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves an address without cancellation.
    ///
    /// Returns `Ok(None)` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns the last provider error if every provider call failed.
    pub async fn resolve(&self, address: &str) -> Result<Option<ScoredResult>, GeocodeError> {
        match self.resolve_cancellable(address, &CancelToken::new()).await? {
            Resolved::Matched(result) => Ok(Some(result)),
            Resolved::NotFound | Resolved::Canceled => Ok(None),
        }
    }

    /// Resolves an address, stopping early once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the last provider error if every provider call failed.
    pub async fn resolve_cancellable(
        &self,
        address: &str,
        cancel: &CancelToken,
    ) -> Result<Resolved, GeocodeError> {
        if cancel.is_canceled() {
            return Ok(Resolved::Canceled);
        }

        let set = variants::generate(address, self.config.max_variants);
        let mut search = Search::new(set.structure.has_house_number());

        log::info!(
            "Resolving {address:?} with {} variant(s) across {} provider(s) ({} mode)",
            set.variants.len(),
            self.providers.len(),
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let flow = if self.config.parallel {
            self.search_parallel(&mut search, &set.variants, cancel).await
        } else {
            self.search_sequential(&mut search, &set.variants, cancel)
                .await
        };

        match flow {
            Flow::Found(result) => {
                log::info!(
                    "Resolved {address:?} at rank {} via {}",
                    result.precision_rank,
                    result.matched.provider_name
                );
                Ok(Resolved::Matched(result))
            }
            Flow::Canceled => Ok(cancel_logged(address)),
            Flow::Exhausted => self.finish(&set.structure, search, cancel).await,
        }
    }

    /// Resolves an address into the caller-facing shape, with the position
    /// in both WGS84 and BD09.
    ///
    /// # Errors
    ///
    /// Returns the last provider error if every provider call failed.
    pub async fn resolve_outcome(
        &self,
        address: &str,
        cancel: &CancelToken,
    ) -> Result<ResolveOutcome, GeocodeError> {
        Ok(match self.resolve_cancellable(address, cancel).await? {
            Resolved::Matched(result) => {
                let estimated = result.estimated;
                let resolution = to_resolution(address, result);
                if estimated {
                    ResolveOutcome::Estimated(resolution)
                } else {
                    ResolveOutcome::Found(resolution)
                }
            }
            Resolved::NotFound => ResolveOutcome::NotFound {
                suggestions: suggestions(&coord_map_address::parse(address)),
            },
            Resolved::Canceled => ResolveOutcome::Canceled,
        })
    }

    async fn search_sequential(
        &self,
        search: &mut Search,
        variants: &[String],
        cancel: &CancelToken,
    ) -> Flow {
        for (rank, variant) in variants.iter().enumerate() {
            match self.lookup(search, variant, cancel).await {
                Lookup::Canceled => return Flow::Canceled,
                Lookup::Miss => {}
                Lookup::Hit(matches) => {
                    if let Some(result) = scoring::select_best(matches, variant, rank)
                        && let Some(done) = search.offer(result, self.config.early_exit_rank)
                    {
                        return Flow::Found(done);
                    }
                }
            }
        }
        Flow::Exhausted
    }

    /// Issues every (variant, provider) pair of the first
    /// `parallel_variant_limit` variants at once, each provider at its own
    /// pace, then walks the answers in rank order.
    async fn search_parallel(
        &self,
        search: &mut Search,
        variants: &[String],
        cancel: &CancelToken,
    ) -> Flow {
        use futures::stream::{self, StreamExt as _};

        let batch = &variants[..self.config.parallel_variant_limit.min(variants.len())];
        let pacers: Vec<Pacer> = self
            .providers
            .iter()
            .map(|provider| Pacer::new(self.pacing(provider.as_ref())))
            .collect();

        let per_provider = self.providers.iter().zip(&pacers).map(|(provider, pacer)| {
            stream::iter(batch.iter().enumerate().map(move |(rank, variant)| async move {
                pacer.wait().await;
                (rank, self.call(provider.as_ref(), variant).await)
            }))
            .buffer_unordered(provider.max_in_flight().max(1))
            .collect::<Vec<_>>()
        });

        let answers = tokio::select! {
            () = cancel.canceled() => return Flow::Canceled,
            answers = futures::future::join_all(per_provider) => answers,
        };

        let mut table: Vec<Vec<Option<Result<Vec<GeocodeMatch>, GeocodeError>>>> = batch
            .iter()
            .map(|_| self.providers.iter().map(|_| None).collect())
            .collect();
        for (index, provider_answers) in answers.into_iter().enumerate() {
            for (rank, result) in provider_answers {
                table[rank][index] = Some(result);
            }
        }

        for (rank, (variant, row)) in batch.iter().zip(table).enumerate() {
            let mut hit = None;
            for (provider, result) in self.providers.iter().zip(row) {
                let Some(result) = result else { continue };
                let matches = search.record(provider.name(), variant, result);
                if hit.is_none() {
                    hit = matches;
                }
            }

            if let Some(result) = hit.and_then(|m| scoring::select_best(m, variant, rank))
                && let Some(done) = search.offer(result, self.config.early_exit_rank)
            {
                return Flow::Found(done);
            }
        }

        Flow::Exhausted
    }

    /// Asks the providers in order until one has matches for `query`.
    async fn lookup(&self, search: &mut Search, query: &str, cancel: &CancelToken) -> Lookup {
        for provider in &self.providers {
            if search.attempts > 0 {
                let delay = self.pacing(provider.as_ref());
                if !delay.is_zero() && cancel.sleep(delay).await {
                    return Lookup::Canceled;
                }
            }
            if cancel.is_canceled() {
                return Lookup::Canceled;
            }

            let result = tokio::select! {
                () = cancel.canceled() => return Lookup::Canceled,
                result = self.call(provider.as_ref(), query) => result,
            };

            if let Some(matches) = search.record(provider.name(), query, result) {
                return Lookup::Hit(matches);
            }
        }
        Lookup::Miss
    }

    /// Minimum gap between two calls to `provider`.
    fn pacing(&self, provider: &dyn GeocodeProvider) -> Duration {
        Duration::from_millis(
            self.config
                .inter_request_delay_ms
                .max(provider.min_delay_ms()),
        )
    }

    /// One provider call, bounded by `timeout_ms`.
    async fn call(
        &self,
        provider: &dyn GeocodeProvider,
        query: &str,
    ) -> Result<Vec<GeocodeMatch>, GeocodeError> {
        let timeout_ms = self.config.timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), provider.query(query))
            .await
            .unwrap_or_else(|_| {
                Err(GeocodeError::Timeout {
                    provider: provider.name().to_string(),
                    timeout_ms,
                })
            })
    }

    async fn finish(
        &self,
        target: &AddressStructure,
        mut search: Search,
        cancel: &CancelToken,
    ) -> Result<Resolved, GeocodeError> {
        if let Some(best) = search.best_precise.take() {
            return Ok(Resolved::Matched(best));
        }

        if search.want_house {
            match self.escalate(target, &mut search, cancel).await {
                Flow::Found(estimate) => {
                    log::info!(
                        "Estimated {:?} by {} interpolation",
                        target.original,
                        estimate.matched.raw_type.as_deref().unwrap_or("street")
                    );
                    return Ok(Resolved::Matched(estimate));
                }
                Flow::Canceled => return Ok(cancel_logged(&target.original)),
                Flow::Exhausted => {}
            }
        }

        if let Some(best) = search.best_any.take() {
            return Ok(Resolved::Matched(best));
        }

        if search.all_failed()
            && let Some(e) = search.last_error.take()
        {
            return Err(e);
        }

        log::info!("No match for {:?}", target.original);
        Ok(Resolved::NotFound)
    }

    /// Gathers reference points for `target` and interpolates from them.
    async fn escalate(
        &self,
        target: &AddressStructure,
        search: &mut Search,
        cancel: &CancelToken,
    ) -> Flow {
        let mut refs = references::collect_references(target, &search.collected);
        let mut context = EstimateContext::StreetInterpolation;

        if refs.len() < 2 && self.config.reference_probes {
            for query in references::road_probe_queries(target) {
                match self.lookup(search, &query, cancel).await {
                    Lookup::Canceled => return Flow::Canceled,
                    Lookup::Miss => {}
                    Lookup::Hit(matches) => {
                        if let Some(best) = scoring::select_best(matches, &query, 0) {
                            refs.push(ReferencePoint {
                                coordinate: best.matched.coordinate,
                                source_address: best.matched.display_address,
                                confidence: references::ROAD_PROBE_CONFIDENCE,
                            });
                        }
                    }
                }
            }
        }

        if refs.is_empty() && self.config.reference_probes {
            for query in references::nearby_probe_queries(target) {
                match self.lookup(search, &query, cancel).await {
                    Lookup::Canceled => return Flow::Canceled,
                    Lookup::Miss => {}
                    Lookup::Hit(matches) => {
                        if let Some(best) = scoring::select_best(matches, &query, 0) {
                            refs.push(ReferencePoint {
                                coordinate: best.matched.coordinate,
                                source_address: best.matched.display_address,
                                confidence: best.confidence,
                            });
                            context = EstimateContext::NearbyReference;
                            break;
                        }
                    }
                }
            }
        }

        log::debug!(
            "{} reference point(s) for {:?}",
            refs.len(),
            target.original
        );

        interpolation::estimate(target, &refs, context).map_or(Flow::Exhausted, Flow::Found)
    }
}

fn cancel_logged(address: &str) -> Resolved {
    log::info!("Resolution of {address:?} canceled");
    Resolved::Canceled
}

fn to_resolution(address: &str, result: ScoredResult) -> Resolution {
    let wgs84 = result.matched.coordinate;
    Resolution {
        input_address: address.to_string(),
        display_address: result.matched.display_address,
        wgs84,
        bd09: wgs84_to_bd09(wgs84.longitude, wgs84.latitude),
        confidence: result.confidence,
        source: result.matched.provider_name,
        estimated: result.estimated,
        precision: result.precision,
        precision_rank: result.precision_rank,
        variant: result.variant,
    }
}

/// Coarser levels of the address, finest first.
fn suggestions(structure: &AddressStructure) -> Vec<String> {
    variants::dedupe(
        [
            &structure.road_level,
            &structure.district_level,
            &structure.city_level,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect(),
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use coord_map_geocoder_models::{AddressDetails, Coordinate, INTERPOLATION_PROVIDER};

    use super::*;

    type Answer = Box<dyn Fn(&str) -> Result<Vec<GeocodeMatch>, GeocodeError> + Send + Sync>;

    struct FakeProvider {
        name: String,
        delay: Option<Duration>,
        min_delay_ms: u64,
        in_flight: usize,
        calls: Mutex<Vec<String>>,
        started: Mutex<Vec<Instant>>,
        answer: Answer,
    }

    impl FakeProvider {
        fn new(
            name: &str,
            answer: impl Fn(&str) -> Result<Vec<GeocodeMatch>, GeocodeError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay: None,
                min_delay_ms: 0,
                in_flight: 4,
                calls: Mutex::new(Vec::new()),
                started: Mutex::new(Vec::new()),
                answer: Box::new(answer),
            })
        }

        fn slow(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay: Some(delay),
                min_delay_ms: 0,
                in_flight: 4,
                calls: Mutex::new(Vec::new()),
                started: Mutex::new(Vec::new()),
                answer: Box::new(|_| Ok(Vec::new())),
            })
        }

        /// Never matches; asks for `min_delay_ms` between calls.
        fn rate_limited(name: &str, min_delay_ms: u64, in_flight: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay: None,
                min_delay_ms,
                in_flight,
                calls: Mutex::new(Vec::new()),
                started: Mutex::new(Vec::new()),
                answer: Box::new(|_| Ok(Vec::new())),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Gaps between the starts of consecutive calls.
        fn gaps(&self) -> Vec<Duration> {
            self.started
                .lock()
                .unwrap()
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect()
        }
    }

    #[async_trait]
    impl GeocodeProvider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn max_in_flight(&self) -> usize {
            self.in_flight
        }

        fn min_delay_ms(&self) -> u64 {
            self.min_delay_ms
        }

        async fn query(&self, text: &str) -> Result<Vec<GeocodeMatch>, GeocodeError> {
            self.calls.lock().unwrap().push(text.to_string());
            self.started.lock().unwrap().push(Instant::now());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.answer)(text)
        }
    }

    const TARGET: &str = "新北市新店區北宜路二段100號";

    fn config() -> ResolverConfig {
        ResolverConfig {
            inter_request_delay_ms: 0,
            timeout_ms: 1000,
            ..ResolverConfig::default()
        }
    }

    fn resolver(config: ResolverConfig, providers: &[&Arc<FakeProvider>]) -> GeocodeResolver {
        GeocodeResolver::new(
            config,
            providers
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn GeocodeProvider>)
                .collect(),
        )
    }

    fn house_match(provider: &str) -> GeocodeMatch {
        GeocodeMatch {
            coordinate: Coordinate::new(121.5384, 24.9561),
            display_address: "100, 北宜路二段, 新店區, 新北市, 臺灣".to_string(),
            provider_name: provider.to_string(),
            raw_class: Some("building".to_string()),
            raw_type: Some("house".to_string()),
            has_house_number: Some(true),
            importance: Some(0.3),
            details: AddressDetails {
                house_number: Some("100".to_string()),
                road: Some("北宜路二段".to_string()),
                ..AddressDetails::default()
            },
        }
    }

    fn road_match(lng: f64, lat: f64) -> GeocodeMatch {
        GeocodeMatch {
            coordinate: Coordinate::new(lng, lat),
            display_address: "北宜路二段, 新店區, 新北市, 臺灣".to_string(),
            provider_name: "fake".to_string(),
            raw_class: Some("highway".to_string()),
            raw_type: Some("secondary".to_string()),
            has_house_number: Some(false),
            importance: Some(0.2),
            details: AddressDetails {
                road: Some("北宜路二段".to_string()),
                ..AddressDetails::default()
            },
        }
    }

    #[tokio::test]
    async fn house_match_at_first_rank_exits_early() {
        let fake = FakeProvider::new("fake", |_| Ok(vec![house_match("fake")]));
        let resolver = resolver(config(), &[&fake]);

        let result = resolver.resolve(TARGET).await.unwrap().unwrap();

        assert_eq!(fake.calls().len(), 1);
        assert_eq!(result.precision_rank, 0);
        assert_eq!(result.precision, Precision::HouseNumber);
        assert!(!result.estimated);
        assert!(result.confidence >= scoring::HOUSE_LEVEL_CONFIDENCE_FLOOR);
    }

    #[tokio::test]
    async fn later_provider_answers_when_first_is_empty() {
        let empty = FakeProvider::new("empty", |_| Ok(Vec::new()));
        let full = FakeProvider::new("full", |_| Ok(vec![house_match("full")]));
        let resolver = resolver(config(), &[&empty, &full]);

        let result = resolver.resolve(TARGET).await.unwrap().unwrap();

        assert_eq!(result.matched.provider_name, "full");
        assert_eq!(empty.calls().len(), 1);
        assert_eq!(full.calls().len(), 1);
    }

    #[tokio::test]
    async fn every_call_failing_is_an_error() {
        let failing = FakeProvider::new("failing", |_| Err(GeocodeError::RateLimited));
        let resolver = resolver(config(), &[&failing]);

        let err = resolver.resolve(TARGET).await.unwrap_err();

        assert!(matches!(err, GeocodeError::RateLimited));
        assert!(failing.calls().len() > 1);
    }

    #[tokio::test]
    async fn failures_mixed_with_empty_answers_are_not_found() {
        let failing = FakeProvider::new("failing", |_| Err(GeocodeError::RateLimited));
        let empty = FakeProvider::new("empty", |_| Ok(Vec::new()));
        let resolver = resolver(config(), &[&failing, &empty]);

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);
    }

    #[tokio::test]
    async fn road_matches_escalate_to_estimate() {
        let fake = FakeProvider::new("fake", |query| {
            let lat = if query.contains("Taiwan") { 24.9570 } else { 24.9550 };
            Ok(vec![road_match(121.5390, lat)])
        });
        let resolver = resolver(config(), &[&fake]);

        let result = resolver.resolve(TARGET).await.unwrap().unwrap();

        assert!(result.estimated);
        assert!(result.confidence < scoring::HOUSE_LEVEL_CONFIDENCE_FLOOR);
        assert_eq!(result.matched.provider_name, INTERPOLATION_PROVIDER);
        assert_eq!(result.matched.raw_type.as_deref(), Some("street"));

        let near = Coordinate::new(121.5390, 24.9560);
        assert!(near.distance_to(&result.matched.coordinate) < 200.0);
    }

    #[tokio::test]
    async fn road_match_without_house_number_is_returned() {
        let fake = FakeProvider::new("fake", |_| Ok(vec![road_match(121.539, 24.955)]));
        let resolver = resolver(config(), &[&fake]);

        let result = resolver
            .resolve("新北市新店區北宜路二段")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fake.calls().len(), 1);
        assert_eq!(result.precision, Precision::Road);
        assert!(!result.estimated);
    }

    #[tokio::test]
    async fn nearby_landmark_feeds_nearby_estimate() {
        let fake = FakeProvider::new("fake", |query| {
            if query.ends_with("7-11") {
                Ok(vec![GeocodeMatch {
                    coordinate: Coordinate::new(121.541, 24.958),
                    display_address: "7-ELEVEN 新店門市, 新店區, 新北市, 臺灣".to_string(),
                    provider_name: "fake".to_string(),
                    raw_class: Some("shop".to_string()),
                    raw_type: Some("convenience".to_string()),
                    has_house_number: None,
                    importance: None,
                    details: AddressDetails::default(),
                }])
            } else {
                Ok(Vec::new())
            }
        });
        let resolver = resolver(config(), &[&fake]);

        let result = resolver.resolve(TARGET).await.unwrap().unwrap();

        assert!(result.estimated);
        assert!((result.confidence - 0.65).abs() < 1e-12);
        assert!(fake.calls().iter().any(|q| q.ends_with("起點")));
    }

    #[tokio::test]
    async fn probes_can_be_disabled() {
        let fake = FakeProvider::new("fake", |_| Ok(Vec::new()));
        let config = ResolverConfig {
            reference_probes: false,
            max_variants: 4,
            ..config()
        };
        let resolver = resolver(config, &[&fake]);

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);
        assert_eq!(fake.calls().len(), 4);
    }

    #[tokio::test]
    async fn parallel_mode_prefers_lowest_rank() {
        let empty = FakeProvider::new("empty", |_| Ok(Vec::new()));
        let full = FakeProvider::new("full", |_| Ok(vec![house_match("full")]));
        let config = ResolverConfig {
            parallel: true,
            parallel_variant_limit: 3,
            ..config()
        };
        let resolver = resolver(config, &[&empty, &full]);

        let result = resolver.resolve(TARGET).await.unwrap().unwrap();

        assert_eq!(result.precision_rank, 0);
        assert_eq!(result.matched.provider_name, "full");
        assert_eq!(empty.calls().len(), 3);
        assert_eq!(full.calls().len(), 3);
    }

    #[tokio::test]
    async fn canceled_before_start() {
        let fake = FakeProvider::new("fake", |_| Ok(vec![house_match("fake")]));
        let resolver = resolver(config(), &[&fake]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = resolver.resolve_cancellable(TARGET, &cancel).await.unwrap();

        assert_eq!(outcome, Resolved::Canceled);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn canceled_mid_flight() {
        let slow = FakeProvider::slow("slow", Duration::from_secs(30));
        let config = ResolverConfig {
            timeout_ms: 60_000,
            ..config()
        };
        let resolver = resolver(config, &[&slow]);
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve_cancellable(TARGET, &cancel),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome, Resolved::Canceled);
        assert_eq!(slow.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let slow = FakeProvider::slow("slow", Duration::from_millis(500));
        let config = ResolverConfig {
            timeout_ms: 10,
            max_variants: 2,
            reference_probes: false,
            ..config()
        };
        let resolver = resolver(config, &[&slow]);

        let err = resolver.resolve(TARGET).await.unwrap_err();

        assert!(matches!(err, GeocodeError::Timeout { timeout_ms: 10, .. }));
    }

    #[tokio::test]
    async fn outcome_carries_both_datums() {
        let fake = FakeProvider::new("fake", |_| Ok(vec![house_match("fake")]));
        let resolver = resolver(config(), &[&fake]);

        let outcome = resolver
            .resolve_outcome(TARGET, &CancelToken::new())
            .await
            .unwrap();

        let ResolveOutcome::Found(resolution) = outcome else {
            panic!("expected a found outcome, got {outcome:?}");
        };
        assert_eq!(resolution.input_address, TARGET);
        assert_eq!(resolution.source, "fake");
        assert!(resolution.wgs84.distance_to(&resolution.bd09) > 100.0);
    }

    #[tokio::test]
    async fn not_found_suggests_coarser_levels() {
        let fake = FakeProvider::new("fake", |_| Ok(Vec::new()));
        let config = ResolverConfig {
            reference_probes: false,
            ..config()
        };
        let resolver = resolver(config, &[&fake]);

        let outcome = resolver
            .resolve_outcome(TARGET, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ResolveOutcome::NotFound {
                suggestions: vec![
                    "新北市新店區北宜路二段".to_string(),
                    "新北市新店區".to_string(),
                    "新北市".to_string(),
                ],
            }
        );
    }

    fn four_unpaced_variants(parallel: bool, delay_ms: u64) -> ResolverConfig {
        ResolverConfig {
            inter_request_delay_ms: delay_ms,
            max_variants: 4,
            parallel,
            parallel_variant_limit: 4,
            reference_probes: false,
            ..config()
        }
    }

    fn assert_spaced(provider: &FakeProvider, calls: usize, min_gap: Duration) {
        let gaps = provider.gaps();
        assert_eq!(gaps.len() + 1, calls, "{} calls", provider.name);
        assert!(
            gaps.iter().all(|gap| *gap >= min_gap),
            "{} gaps {gaps:?} shorter than {min_gap:?}",
            provider.name
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_wait_for_configured_delay() {
        let fake = FakeProvider::rate_limited("fake", 0, 1);
        let resolver = resolver(four_unpaced_variants(false, 300), &[&fake]);
        let start = Instant::now();

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);

        assert_spaced(&fake, 4, Duration::from_millis(300));
        assert_eq!(fake.started.lock().unwrap()[0], start);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_use_the_longer_of_both_delays() {
        let fake = FakeProvider::rate_limited("fake", 250, 1);
        let resolver = resolver(four_unpaced_variants(false, 100), &[&fake]);

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);

        assert_spaced(&fake, 4, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_calls_keep_provider_rate_limit() {
        let fake = FakeProvider::rate_limited("fake", 200, 1);
        let resolver = resolver(four_unpaced_variants(true, 0), &[&fake]);

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);

        assert_spaced(&fake, 4, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_pacing_holds_with_several_in_flight() {
        let fake = FakeProvider::rate_limited("fake", 200, 4);
        let resolver = resolver(four_unpaced_variants(true, 50), &[&fake]);

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);

        assert_spaced(&fake, 4, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_providers_are_paced_independently() {
        let first = FakeProvider::rate_limited("first", 200, 1);
        let second = FakeProvider::rate_limited("second", 200, 1);
        let resolver = resolver(four_unpaced_variants(true, 0), &[&first, &second]);
        let start = Instant::now();

        assert_eq!(resolver.resolve(TARGET).await.unwrap(), None);

        assert_spaced(&first, 4, Duration::from_millis(200));
        assert_spaced(&second, 4, Duration::from_millis(200));
        assert_eq!(first.started.lock().unwrap()[0], start);
        assert_eq!(second.started.lock().unwrap()[0], start);
    }

    #[test]
    fn lower_rank_beats_higher_score() {
        let mut slot = None;
        let mut coarse = scoring::score(road_match(121.5, 25.0), "b", 4);
        coarse.score = 500.0;
        keep_better(&mut slot, coarse);
        keep_better(&mut slot, scoring::score(road_match(121.5, 25.0), "a", 1));
        assert_eq!(slot.unwrap().variant, "a");
    }
}
