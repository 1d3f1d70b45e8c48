/*!
 * Timing pipeline that turns timed text into subtitle lines.
 *
 * Submodules, leaves first:
 *
 * - `segment`: Shared line model (word ranges, time ranges, segments, blocks)
 * - `time_source`: Word timestamps and the inputs that produce them
 * - `splitter`: Breaks over-long text at linguistic boundaries
 * - `resolver`: Initial timing from speech plus trailing-silence extension
 * - `enforcer`: Multi-pass constraint enforcement
 */

pub use self::enforcer::{BlockState, ConstraintEnforcer, EnforcementOutcome};
pub use self::resolver::TimingResolver;
pub use self::segment::{Block, Segment, TimeRange, WordRange};
pub use self::splitter::{BoundaryRule, SegmentSplitter, SplitPiece};
pub use self::time_source::{TimeSource, TimedText, WordTimestamp};

pub mod enforcer;
pub mod resolver;
pub mod segment;
pub mod splitter;
pub mod time_source;
