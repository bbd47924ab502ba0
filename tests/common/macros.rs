/// Asserts that two floats agree to within `1e-4` (or the given tolerance).
#[macro_export]
macro_rules! assert_approx {
    ($left:expr, $right:expr) => {
        $crate::assert_approx!($left, $right, 1e-4)
    };
    ($left:expr, $right:expr, $tol:expr) => {
        let (left, right): (f64, f64) = ($left, $right);
        assert!(
            (left - right).abs() <= $tol,
            "{} = {} differs from {} by more than {}",
            stringify!($left),
            left,
            right,
            $tol
        );
    };
}

/// Asserts the sizes of the active, ancestor and outside partitions.
#[macro_export]
macro_rules! assert_partitions {
    ($sys:expr, active: $active:expr, ancestors: $ancestors:expr, outside: $outside:expr) => {
        assert_eq!($sys.num_active(), $active, "active partition size");
        assert_eq!($sys.num_ancestors(), $ancestors, "ancestor partition size");
        assert_eq!($sys.num_outside(), $outside, "outside partition size");
    };
}

/// Asserts that the organism counts of all active taxa add up to `total`.
#[macro_export]
macro_rules! assert_org_total {
    ($sys:expr, $total:expr) => {
        let counted: usize = $sys
            .active_taxa()
            .iter()
            .map(|id| $sys.taxon(*id).num_orgs())
            .sum();
        assert_eq!(counted, $total, "living organisms across active taxa");
    };
}
