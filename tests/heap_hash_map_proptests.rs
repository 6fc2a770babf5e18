// Collector-backed table property tests.
//
// Property: weak-table contents after each collection.
//  - Model: per leaf, whether it is rooted, strongly linked from a rooted
//    registry table, and whether marking already reached it this cycle.
//  - Invariant: after a cycle ends, the weak table holds exactly the leaves
//    that survived, and the heap holds those leaves plus the registry.
//  - Survivors: rooted or linked at the end of marking, or marked earlier
//    in the cycle (rooted at its start, allocated or rooted during it).
//  - Operations: allocate (optionally rooted), unroot, link into the
//    registry, start marking, advance marking, finish the cycle. Links made
//    while marking rely on the table's insertion barrier.
use heap_hashtable::{
    GarbageCollected, GcPhase, HashMap, Heap, HeapHashMap, Member, Persistent, Trace, Visitor,
    WeakMember,
};
use proptest::prelude::*;

struct Leaf;

impl Trace for Leaf {
    fn trace(&self, _visitor: &mut Visitor<'_>) {}
}

impl GarbageCollected for Leaf {}

struct Registry {
    links: HeapHashMap<u32, Member<Leaf>>,
}

impl Trace for Registry {
    fn trace(&self, visitor: &mut Visitor<'_>) {
        visitor.trace(&self.links);
    }
}

impl GarbageCollected for Registry {}

#[derive(Clone, Debug)]
enum Op {
    Alloc { rooted: bool },
    Unroot(usize),
    Link(usize),
    StartMarking,
    Advance(usize),
    Finish,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => any::<bool>().prop_map(|rooted| Op::Alloc { rooted }),
        2 => any::<usize>().prop_map(Op::Unroot),
        2 => any::<usize>().prop_map(Op::Link),
        1 => Just(Op::StartMarking),
        2 => (1usize..4).prop_map(Op::Advance),
        1 => Just(Op::Finish),
    ]
}

struct LeafModel {
    member: Member<Leaf>,
    id: u32,
    root: Option<Persistent<Leaf>>,
    linked: bool,
    marked: bool,
}

struct World {
    heap: Heap,
    registry: Member<Registry>,
    _registry_root: Persistent<Registry>,
    weak: HeapHashMap<WeakMember<Leaf>, u32>,
    leaves: Vec<LeafModel>,
    next_id: u32,
}

impl World {
    fn new() -> Self {
        let heap = Heap::new();
        let registry = heap.allocate(Registry {
            links: HashMap::new_in(heap.allocator()),
        });
        let registry_root = heap.persistent(registry);
        let weak = HashMap::new_in(heap.allocator());
        Self {
            heap,
            registry,
            _registry_root: registry_root,
            weak,
            leaves: Vec::new(),
            next_id: 0,
        }
    }

    fn marking(&self) -> bool {
        self.heap.phase() == GcPhase::Marking
    }

    fn finish(&mut self) -> Result<(), TestCaseError> {
        if !self.marking() {
            return Ok(());
        }
        let broker = self.heap.finish_marking();
        self.weak.process_weak(&broker);
        self.heap.sweep();

        self.leaves
            .retain(|leaf| leaf.marked || leaf.root.is_some() || leaf.linked);
        prop_assert_eq!(self.weak.len(), self.leaves.len());
        prop_assert_eq!(self.heap.object_count(), self.leaves.len() + 1);
        for leaf in &mut self.leaves {
            prop_assert_eq!(self.weak.get(&leaf.member.downgrade()), Some(&leaf.id));
            prop_assert!(self.heap.contains(leaf.member.id()));
            leaf.marked = false;
        }
        Ok(())
    }

    fn apply(&mut self, op: Op) -> Result<(), TestCaseError> {
        match op {
            Op::Alloc { rooted } => {
                let member = self.heap.allocate(Leaf);
                let id = self.next_id;
                self.next_id += 1;
                let root = rooted.then(|| self.heap.persistent(member));
                self.weak.set(member.downgrade(), id);
                let marked = self.marking();
                self.leaves.push(LeafModel {
                    member,
                    id,
                    root,
                    linked: false,
                    marked,
                });
            }
            Op::Unroot(i) => {
                if !self.leaves.is_empty() {
                    let n = self.leaves.len();
                    self.leaves[i % n].root = None;
                }
            }
            Op::Link(i) => {
                if !self.leaves.is_empty() {
                    let n = self.leaves.len();
                    let leaf = &mut self.leaves[i % n];
                    let (id, member) = (leaf.id, leaf.member);
                    leaf.linked = true;
                    if self.heap.phase() == GcPhase::Marking {
                        leaf.marked = true;
                    }
                    self.heap.with_mut(self.registry, |r| {
                        r.links.set(id, member);
                    });
                }
            }
            Op::StartMarking => {
                if !self.marking() {
                    self.heap.start_marking();
                    for leaf in &mut self.leaves {
                        leaf.marked = leaf.root.is_some() || leaf.linked;
                    }
                }
            }
            Op::Advance(budget) => {
                if self.marking() {
                    self.heap.advance_marking(budget);
                }
            }
            Op::Finish => self.finish()?,
        }
        prop_assert_eq!(self.weak.len(), self.leaves.len());
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_weak_table_tracks_survivors(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let mut world = World::new();
        for op in ops {
            world.apply(op)?;
        }
        world.finish()?;
        // One more full cycle with nothing in flight.
        world.apply(Op::StartMarking)?;
        world.finish()?;
    }
}
