//! Send/Sync guarantees for core types.

use femtobatch::{
    DatadogDeviceBuilder, FemtoAppendingDevice, FemtoDatadogDevice, FemtoFileDevice,
    FemtoHttpDevice, HttpDeviceBuilder, SendQueue, SharedMessageFormatter, ThreadExecutor,
};
use rstest::rstest;
use static_assertions::assert_impl_all;

#[rstest]
fn builders_are_send_sync() {
    assert_impl_all!(HttpDeviceBuilder: Send, Sync);
    assert_impl_all!(DatadogDeviceBuilder: Send, Sync);
}

#[rstest]
fn devices_are_send_sync() {
    assert_impl_all!(FemtoHttpDevice: Send, Sync);
    assert_impl_all!(FemtoDatadogDevice: Send, Sync);
    assert_impl_all!(FemtoAppendingDevice: Send, Sync);
    assert_impl_all!(FemtoFileDevice: Send, Sync);
}

#[rstest]
fn components_are_send_sync() {
    assert_impl_all!(SendQueue: Send, Sync);
    assert_impl_all!(SharedMessageFormatter: Send, Sync);
    assert_impl_all!(ThreadExecutor: Send, Sync);
}
