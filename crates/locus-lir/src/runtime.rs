// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Runtime entry points the generated code calls.
//!
//! Transfer entry points end with three debug tokens: a per-site
//! communication id, the source line and the source file id (all `i32`).

use crate::LirType;

use crate::LirType::{I32, I64, I8, Ptr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// `get(dst, locale, raddr, size, ..)`
    Get,
    /// `put(src, locale, raddr, size, ..)`
    Put,
    /// `get_strd(local, local_strides, locale, remote, remote_strides, counts, levels, elem_size, ..)`
    GetStrided,
    /// Same argument order as [`RuntimeFn::GetStrided`], data flows local to remote.
    PutStrided,
    /// `prefetch(locale, raddr, size, ..)`
    Prefetch,
    GetUnordered,
    PutUnordered,
    /// `getput(dst_locale, dst_raddr, src_locale, src_raddr, size, ..)`
    GetPutUnordered,
    /// Waits for every unordered transfer issued by the current task.
    UnorderedFence,
    LocaleHere,
    NodeId,
    NodeFromLocale,
    CheckNil,
    CheckLocal,
    IsLocal,
}

impl RuntimeFn {
    pub const ALL: [RuntimeFn; 15] = [
        RuntimeFn::Get,
        RuntimeFn::Put,
        RuntimeFn::GetStrided,
        RuntimeFn::PutStrided,
        RuntimeFn::Prefetch,
        RuntimeFn::GetUnordered,
        RuntimeFn::PutUnordered,
        RuntimeFn::GetPutUnordered,
        RuntimeFn::UnorderedFence,
        RuntimeFn::LocaleHere,
        RuntimeFn::NodeId,
        RuntimeFn::NodeFromLocale,
        RuntimeFn::CheckNil,
        RuntimeFn::CheckLocal,
        RuntimeFn::IsLocal,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::Get => "locus_comm_get",
            RuntimeFn::Put => "locus_comm_put",
            RuntimeFn::GetStrided => "locus_comm_get_strd",
            RuntimeFn::PutStrided => "locus_comm_put_strd",
            RuntimeFn::Prefetch => "locus_comm_prefetch",
            RuntimeFn::GetUnordered => "locus_comm_get_unordered",
            RuntimeFn::PutUnordered => "locus_comm_put_unordered",
            RuntimeFn::GetPutUnordered => "locus_comm_getput_unordered",
            RuntimeFn::UnorderedFence => "locus_comm_unordered_fence",
            RuntimeFn::LocaleHere => "locus_locale_here",
            RuntimeFn::NodeId => "locus_node_id",
            RuntimeFn::NodeFromLocale => "locus_node_from_locale",
            RuntimeFn::CheckNil => "locus_check_nil",
            RuntimeFn::CheckLocal => "locus_check_local",
            RuntimeFn::IsLocal => "locus_is_local",
        }
    }

    pub fn params(self) -> &'static [LirType] {
        match self {
            RuntimeFn::Get | RuntimeFn::Put | RuntimeFn::GetUnordered | RuntimeFn::PutUnordered => {
                &[Ptr, I64, Ptr, I64, I32, I32, I32]
            }
            RuntimeFn::GetStrided | RuntimeFn::PutStrided => {
                &[Ptr, Ptr, I64, Ptr, Ptr, Ptr, I32, I64, I32, I32, I32]
            }
            RuntimeFn::Prefetch => &[I64, Ptr, I64, I32, I32, I32],
            RuntimeFn::GetPutUnordered => &[I64, Ptr, I64, Ptr, I64, I32, I32, I32],
            RuntimeFn::UnorderedFence | RuntimeFn::LocaleHere | RuntimeFn::NodeId => &[],
            RuntimeFn::NodeFromLocale | RuntimeFn::IsLocal => &[I64],
            RuntimeFn::CheckNil => &[Ptr, I32, I32],
            RuntimeFn::CheckLocal => &[I64, I32, I32],
        }
    }

    pub fn ret(self) -> Option<LirType> {
        match self {
            RuntimeFn::LocaleHere => Some(I64),
            RuntimeFn::NodeId | RuntimeFn::NodeFromLocale => Some(I32),
            RuntimeFn::IsLocal => Some(I8),
            _ => None,
        }
    }

    pub fn from_symbol(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.symbol() == name)
    }

    /// Moves data between locales.
    pub fn is_transfer(self) -> bool {
        matches!(
            self,
            RuntimeFn::Get
                | RuntimeFn::Put
                | RuntimeFn::GetStrided
                | RuntimeFn::PutStrided
                | RuntimeFn::GetUnordered
                | RuntimeFn::PutUnordered
                | RuntimeFn::GetPutUnordered
        )
    }
}
