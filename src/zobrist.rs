//! Zobrist hashing and the transposition table that stores search nodes
//! keyed by it.
//!
//! Two replacement schemes share one table shape: a non-recycling scheme
//! ("OneDepthVNew") that caps each bucket at two entries and replaces by a
//! reachability/depth/visit-count priority chain, and a recycling scheme
//! that lets buckets grow unbounded but bounds the whole table by evicting
//! the least-recently-touched node off a global FIFO.

use crate::node::Node;

pub type NodeId = usize;

/// XOR-foldable per-move hash contributions. `codes` are masked down to the
/// table's bucket-index width; `keys` are full-width and used for bucket
/// equality checks, so two distinct positions that collide on `codes` are
/// never confused with each other.
pub struct Zobrist {
    codes: Vec<u64>,
    keys: Vec<u64>,
    mask: u64,
}

impl Zobrist {
    pub fn new(move_num: usize, table_bits: u32) -> Self {
        assert!(table_bits > 0 && table_bits < 64);
        let mask = (1u64 << table_bits) - 1;
        let codes = (0..move_num).map(|_| fastrand::u64(..) & mask).collect();
        let keys = (0..move_num).map(|_| fastrand::u64(..)).collect();
        Zobrist { codes, keys, mask }
    }

    /// Self-inverse: calling this twice with the same `move_idx` restores
    /// the original `(code, key)` pair, which is what makes undo and
    /// "peek" (toggle in, read, toggle out) free.
    pub fn toggle(&self, code: &mut u64, key: &mut u64, move_idx: usize) {
        *code ^= self.codes[move_idx];
        *key ^= self.keys[move_idx];
    }

    /// Pure variant of `toggle`, for peeking at a would-be child's hash
    /// without touching any live state.
    pub fn toggled(&self, code: u64, key: u64, move_idx: usize) -> (u64, u64) {
        (code ^ self.codes[move_idx], key ^ self.keys[move_idx])
    }

    pub fn bucket_of(&self, code: u64) -> usize {
        (code & self.mask) as usize
    }
}

enum Bucket {
    /// Non-recycling mode: at most two live slots per bucket.
    Capped(Vec<NodeId>),
    /// Recycling mode: unbounded.
    Open(Vec<NodeId>),
}

impl Bucket {
    fn ids(&self) -> &[NodeId] {
        match self {
            Bucket::Capped(v) | Bucket::Open(v) => v,
        }
    }
    fn ids_mut(&mut self) -> &mut Vec<NodeId> {
        match self {
            Bucket::Capped(v) | Bucket::Open(v) => v,
        }
    }
}

pub struct TranspositionTable {
    pub zobrist: Zobrist,
    buckets: Vec<Bucket>,
    nodes: Vec<Option<Node>>,
    free_slots: Vec<NodeId>,
    recycling: bool,
    budget: usize,
    live_count: usize,
    fifo_head: Option<NodeId>,
    fifo_tail: Option<NodeId>,
    /// Non-recycling mode only: the single victim stashed by the last
    /// `store()`, freed only when `manage_memory()` runs. This keeps a node
    /// that is still on the live search path from ever being freed out from
    /// under it mid-traversal.
    pending_delete: Option<NodeId>,
}

impl TranspositionTable {
    pub fn new(move_num: usize, table_bits: u32, recycling: bool, budget: usize) -> Self {
        let num_buckets = 1usize << table_bits;
        let buckets = (0..num_buckets)
            .map(|_| {
                if recycling {
                    Bucket::Open(Vec::new())
                } else {
                    Bucket::Capped(Vec::new())
                }
            })
            .collect();
        TranspositionTable {
            zobrist: Zobrist::new(move_num, table_bits),
            buckets,
            nodes: Vec::new(),
            free_slots: Vec::new(),
            recycling,
            budget,
            live_count: 0,
            fifo_head: None,
            fifo_tail: None,
            pending_delete: None,
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().expect("dangling NodeId")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().expect("dangling NodeId")
    }

    pub fn load(&self, code: u64, key: u64) -> Option<NodeId> {
        let b = self.zobrist.bucket_of(code);
        self.buckets[b]
            .ids()
            .iter()
            .copied()
            .find(|&id| self.nodes[id].as_ref().unwrap().hash_key == key)
    }

    /// Inserts `new_node` (already stamped with `hash_key`/`depth`) into the
    /// table, applying the active replacement scheme. Returns its id.
    pub fn store(&mut self, code: u64, new_node: Node) -> NodeId {
        let b = self.zobrist.bucket_of(code);
        if self.recycling {
            let id = self.alloc(new_node);
            self.buckets[b].ids_mut().push(id);
            id
        } else if self.buckets[b].ids().len() < 2 {
            let id = self.alloc(new_node);
            self.buckets[b].ids_mut().push(id);
            id
        } else {
            let victim_pos = self.choose_victim(b, new_node.depth);
            let victim_id = self.buckets[b].ids()[victim_pos];
            self.defer_delete(victim_id);
            let id = self.alloc(new_node);
            self.buckets[b].ids_mut()[victim_pos] = id;
            id
        }
    }

    /// Priority chain for the capped (non-recycling) scheme: a node
    /// unreachable from the current root is evicted first; failing that,
    /// the deeper node (considered "older") is evicted; failing that, the
    /// node with fewer visits; a full tie evicts the back slot.
    fn choose_victim(&self, bucket: usize, new_depth: u32) -> usize {
        let ids = self.buckets[bucket].ids();
        let front = self.nodes[ids[0]].as_ref().unwrap();
        let back = self.nodes[ids[1]].as_ref().unwrap();

        match (front.reachable, back.reachable) {
            (false, true) => return 0,
            (true, false) => return 1,
            _ => {}
        }
        if front.depth != back.depth {
            return if front.depth > back.depth { 0 } else { 1 };
        }
        let _ = new_depth;
        let (front_visits, back_visits) = (front.total_visits(), back.total_visits());
        if front_visits != back_visits {
            return if front_visits < back_visits { 0 } else { 1 };
        }
        1
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live_count += 1;
        if let Some(id) = self.free_slots.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free(&mut self, id: NodeId) {
        if self.fifo_contains(id) {
            self.fifo_remove(id);
        }
        self.nodes[id] = None;
        self.free_slots.push(id);
        self.live_count -= 1;
    }

    fn defer_delete(&mut self, id: NodeId) {
        if let Some(old) = self.pending_delete.replace(id) {
            self.free(old);
        }
    }

    fn fifo_contains(&self, id: NodeId) -> bool {
        self.node(id).on_fifo
    }

    pub fn fifo_append(&mut self, id: NodeId) {
        if self.fifo_contains(id) {
            self.fifo_remove(id);
        }
        let tail = self.fifo_tail;
        {
            let node = self.node_mut(id);
            node.fifo_prev = tail;
            node.fifo_next = None;
            node.on_fifo = true;
        }
        match tail {
            Some(t) => self.node_mut(t).fifo_next = Some(id),
            None => self.fifo_head = Some(id),
        }
        self.fifo_tail = Some(id);
    }

    pub fn fifo_remove(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.node(id);
            (node.fifo_prev, node.fifo_next)
        };
        match prev {
            Some(p) => self.node_mut(p).fifo_next = next,
            None => self.fifo_head = next,
        }
        match next {
            Some(n) => self.node_mut(n).fifo_prev = prev,
            None => self.fifo_tail = prev,
        }
        let node = self.node_mut(id);
        node.fifo_prev = None;
        node.fifo_next = None;
        node.on_fifo = false;
    }

    /// Run after backpropagation for the round completes: frees the
    /// deferred non-recycling victim (if any) and, in recycling mode, pops
    /// the FIFO head until the table is back under budget.
    pub fn manage_memory(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            self.free(id);
        }
        if self.recycling {
            while self.live_count >= self.budget {
                let Some(head) = self.fifo_head else { break };
                let code = self.node(head).hash_code;
                let b = self.zobrist.bucket_of(code);
                self.buckets[b].ids_mut().retain(|&id| id != head);
                self.free(head);
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Explicitly evicts a single node (used by `updateRoot` to drop the
    /// previous root once search has moved past it).
    pub fn remove(&mut self, id: NodeId) {
        let code = self.node(id).hash_code;
        let b = self.zobrist.bucket_of(code);
        self.buckets[b].ids_mut().retain(|&i| i != id);
        self.free(id);
    }

    /// Marks every live node unreachable; callers re-mark nodes reachable
    /// as they are visited again from the new root. Used by `updateRoot`
    /// so the capped replacement scheme's reachability tie-break reflects
    /// the current root rather than a stale one.
    pub fn mark_all_unreachable(&mut self) {
        for slot in &mut self.nodes {
            if let Some(n) = slot {
                n.reachable = false;
            }
        }
    }

    /// Drops every stored node and resets the FIFO/pending-delete state,
    /// used when the engine is reset to an empty board.
    pub fn clear(&mut self) {
        for b in &mut self.buckets {
            b.ids_mut().clear();
        }
        self.nodes.clear();
        self.free_slots.clear();
        self.live_count = 0;
        self.fifo_head = None;
        self.fifo_tail = None;
        self.pending_delete = None;
    }
}
