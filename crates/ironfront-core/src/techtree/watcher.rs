use ironfront_protocol::{ActorId, DataId, PlayerId, TechTreeEvent};
use tracing::trace;

use crate::rules::{BuildableInfo, PrerequisiteToken};
use crate::techtree::BuildableIndex;

/// Availability state of one buildable item, as last reported to its owner.
#[derive(Debug, Clone)]
pub struct Watcher {
    key: DataId,
    owner: ActorId,
    prerequisites: Vec<PrerequisiteToken>,
    build_limit: u32,
    has_prerequisites: bool,
    hidden: bool,
}

impl Watcher {
    pub fn new(key: impl Into<DataId>, info: &BuildableInfo, owner: ActorId) -> Self {
        Self {
            key: key.into(),
            owner,
            prerequisites: info.prerequisites.clone(),
            build_limit: info.build_limit,
            has_prerequisites: false,
            hidden: info.hidden,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn has_prerequisites(&self) -> bool {
        self.has_prerequisites
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn reached_build_limit(&self, index: &BuildableIndex) -> bool {
        self.build_limit > 0 && index.count(&self.key) >= self.build_limit as usize
    }

    /// Plain tokens need their key present, negated tokens need it absent.
    fn satisfies_prerequisites(&self, index: &BuildableIndex) -> bool {
        self.prerequisites
            .iter()
            .all(|p| p.negated != index.contains(&p.base_key))
    }

    /// `!~key` always hides; `~key` hides while the key is absent.
    fn hidden_by(&self, index: &BuildableIndex) -> bool {
        self.prerequisites
            .iter()
            .any(|p| p.hidden_marker && (p.negated || !index.contains(&p.base_key)))
    }

    /// Re-evaluates against `index`, emitting only state changes.
    ///
    /// Hidden changes are reported before availability changes.
    pub fn evaluate(
        &mut self,
        player: PlayerId,
        index: &BuildableIndex,
        mut emit: impl FnMut(TechTreeEvent),
    ) {
        let now_available =
            self.satisfies_prerequisites(index) && !self.reached_build_limit(index);
        let now_hidden = self.hidden_by(index);

        trace!(
            key = %self.key,
            available = now_available,
            hidden = now_hidden,
            "watcher evaluated"
        );

        if now_hidden != self.hidden {
            emit(TechTreeEvent::HiddenChanged {
                player,
                owner: self.owner,
                key: self.key.clone(),
                was_hidden: self.hidden,
            });
        }

        if now_available && !self.has_prerequisites {
            emit(TechTreeEvent::PrerequisitesAvailable {
                player,
                owner: self.owner,
                key: self.key.clone(),
            });
        }

        if !now_available && self.has_prerequisites {
            emit(TechTreeEvent::PrerequisitesUnavailable {
                player,
                owner: self.owner,
                key: self.key.clone(),
            });
        }

        self.hidden = now_hidden;
        self.has_prerequisites = now_available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::techtree::VecSink;
    use crate::world::ActorRegistry;

    const P0: PlayerId = PlayerId(0);
    const OWNER: ActorId = ActorId::new(0, 0);

    fn index_of(actors: impl IntoIterator<Item = Actor>) -> BuildableIndex {
        let mut registry = ActorRegistry::default();
        for actor in actors {
            registry.insert(actor);
        }
        BuildableIndex::gather(&registry, Some(P0))
    }

    fn provider(key: &str) -> Actor {
        Actor::new(key, Some(P0)).providing([key])
    }

    fn watcher(key: &str, prerequisites: &[&str], build_limit: u32) -> Watcher {
        Watcher::new(key, &BuildableInfo::new(prerequisites, build_limit), OWNER)
    }

    fn evaluate(w: &mut Watcher, index: &BuildableIndex, sink: &mut VecSink) {
        w.evaluate(P0, index, |event| sink.events.push(event));
    }

    fn available(key: &str) -> TechTreeEvent {
        TechTreeEvent::PrerequisitesAvailable {
            player: P0,
            owner: OWNER,
            key: key.to_string(),
        }
    }

    fn unavailable(key: &str) -> TechTreeEvent {
        TechTreeEvent::PrerequisitesUnavailable {
            player: P0,
            owner: OWNER,
            key: key.to_string(),
        }
    }

    fn hidden_changed(key: &str, was_hidden: bool) -> TechTreeEvent {
        TechTreeEvent::HiddenChanged {
            player: P0,
            owner: OWNER,
            key: key.to_string(),
            was_hidden,
        }
    }

    #[test]
    fn becomes_available_once_prerequisite_appears() {
        let mut w = watcher("proc", &["powr"], 0);
        let mut sink = VecSink::default();

        evaluate(&mut w, &BuildableIndex::default(), &mut sink);
        assert!(sink.events.is_empty());
        assert!(!w.has_prerequisites());

        let index = index_of([provider("powr")]);
        evaluate(&mut w, &index, &mut sink);
        evaluate(&mut w, &index, &mut sink);
        assert_eq!(sink.events, vec![available("proc")]);
    }

    #[test]
    fn repeated_evaluation_is_silent() {
        let mut w = watcher("tsla", &["~stek"], 0);
        let mut sink = VecSink::default();
        let empty = BuildableIndex::default();

        evaluate(&mut w, &empty, &mut sink);
        let first = sink.drain();
        assert_eq!(first, vec![hidden_changed("tsla", false)]);

        evaluate(&mut w, &empty, &mut sink);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn no_prerequisites_is_available_immediately() {
        let mut w = watcher("e1", &[], 0);
        let mut sink = VecSink::default();
        evaluate(&mut w, &BuildableIndex::default(), &mut sink);
        assert_eq!(sink.events, vec![available("e1")]);
    }

    #[test]
    fn negated_prerequisite_requires_absence() {
        let mut w = watcher("spy", &["!radar"], 0);
        let mut sink = VecSink::default();

        evaluate(&mut w, &BuildableIndex::default(), &mut sink);
        assert_eq!(sink.drain(), vec![available("spy")]);

        evaluate(&mut w, &index_of([provider("radar")]), &mut sink);
        assert_eq!(sink.drain(), vec![unavailable("spy")]);

        evaluate(&mut w, &BuildableIndex::default(), &mut sink);
        assert_eq!(sink.drain(), vec![available("spy")]);
    }

    #[test]
    fn prerequisites_are_and_combined() {
        let mut w = watcher("stek", &["weap", "dome"], 0);
        let mut sink = VecSink::default();

        evaluate(&mut w, &index_of([provider("weap")]), &mut sink);
        assert!(sink.events.is_empty());

        evaluate(&mut w, &index_of([provider("weap"), provider("dome")]), &mut sink);
        assert_eq!(sink.events, vec![available("stek")]);
    }

    #[test]
    fn build_limit_toggles_availability() {
        let tank = || Actor::new("tank", Some(P0)).with_build_limit(3);
        let mut w = watcher("tank", &[], 3);
        let mut sink = VecSink::default();

        evaluate(&mut w, &index_of([tank(), tank()]), &mut sink);
        assert_eq!(sink.drain(), vec![available("tank")]);

        evaluate(&mut w, &index_of([tank(), tank(), tank()]), &mut sink);
        assert_eq!(sink.drain(), vec![unavailable("tank")]);

        evaluate(&mut w, &index_of([tank(), tank(), tank(), tank()]), &mut sink);
        assert!(sink.events.is_empty());

        evaluate(&mut w, &index_of([tank(), tank()]), &mut sink);
        assert_eq!(sink.drain(), vec![available("tank")]);
    }

    #[test]
    fn hidden_marker_tracks_key_presence() {
        let mut w = watcher("iron", &["~stek"], 0);
        let mut sink = VecSink::default();

        evaluate(&mut w, &BuildableIndex::default(), &mut sink);
        assert!(w.is_hidden());
        assert_eq!(sink.drain(), vec![hidden_changed("iron", false)]);

        // `~` also requires the key, so both transitions fire together,
        // hidden first.
        evaluate(&mut w, &index_of([provider("stek")]), &mut sink);
        assert!(!w.is_hidden());
        assert_eq!(
            sink.drain(),
            vec![hidden_changed("iron", true), available("iron")]
        );
    }

    #[test]
    fn negated_hidden_marker_always_hides() {
        for index in [BuildableIndex::default(), index_of([provider("lowtech")])] {
            let mut w = watcher("mig", &["!~lowtech"], 0);
            let mut sink = VecSink::default();
            evaluate(&mut w, &index, &mut sink);
            assert!(w.is_hidden());
            assert_eq!(sink.events[0], hidden_changed("mig", false));
        }
    }

    #[test]
    fn initially_hidden_items_report_reveal() {
        let info = BuildableInfo::new(["powr"], 0).hidden(true);
        let mut w = Watcher::new("proc", &info, OWNER);
        let mut sink = VecSink::default();

        evaluate(&mut w, &index_of([provider("powr")]), &mut sink);
        assert_eq!(
            sink.events,
            vec![hidden_changed("proc", true), available("proc")]
        );
    }

    #[test]
    fn empty_token_is_never_satisfied() {
        let mut w = watcher("broken", &[""], 0);
        let mut sink = VecSink::default();
        evaluate(&mut w, &index_of([provider("powr")]), &mut sink);
        assert!(sink.events.is_empty());
        assert!(!w.has_prerequisites());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let index = index_of([provider("powr"), provider("radar")]);
        let run = || {
            let mut w = watcher("x", &["powr", "!radar", "~stek"], 0);
            let mut sink = VecSink::default();
            evaluate(&mut w, &index, &mut sink);
            (sink.events, w.has_prerequisites(), w.is_hidden())
        };
        assert_eq!(run(), run());
    }
}
