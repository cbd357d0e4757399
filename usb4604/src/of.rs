//! 设备树节点抽象
//!
//! 驱动只按名字读取两个属性：`reset-gpios` 和 `initial-mode`。
//! GPIO 引用通过 phandle 指向 GPIO 控制器节点，控制器未注册时查找结果为
//! [`GpioLookup::Deferred`]。

use alloc::{
    collections::btree_map::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use spin::RwLock;
use usb4604_if::gpio::PinId;

/// Result of resolving a named GPIO reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioLookup {
    Found(PinId),
    /// 引用的 GPIO 控制器尚未注册
    Deferred,
    /// 属性不存在或引用无效
    NotFound,
}

pub trait OfNode {
    fn name(&self) -> &str;

    fn is_compatible(&self, compatible: &str) -> bool;

    /// Resolves entry `index` of the GPIO list property `name`.
    fn named_gpio(&self, name: &str, index: usize) -> GpioLookup;

    fn read_u32(&self, name: &str) -> Option<u32>;
}

/// `<&phandle offset>` 形式的 GPIO 引用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioSpec {
    pub phandle: u32,
    pub offset: u32,
}

impl GpioSpec {
    pub const fn new(phandle: u32, offset: u32) -> Self {
        Self { phandle, offset }
    }
}

#[derive(Debug, Clone, Copy)]
struct GpioChip {
    base: u32,
    ngpio: u32,
}

/// 已注册 GPIO 控制器表：phandle -> 全局编号区间
#[derive(Default)]
pub struct GpioChipRegistry {
    chips: RwLock<BTreeMap<u32, GpioChip>>,
}

impl GpioChipRegistry {
    pub const fn new() -> Self {
        Self {
            chips: RwLock::new(BTreeMap::new()),
        }
    }

    /// Makes the chip behind `phandle` available, covering pins
    /// `base..base + ngpio`. Returns `false` if the range does not fit in the
    /// global pin space; the chip is not registered then.
    pub fn register(&self, phandle: u32, base: u32, ngpio: u32) -> bool {
        let Some(end) = base.checked_add(ngpio) else {
            log::warn!("gpiochip phandle {phandle:#x}: pins {base}+{ngpio} out of range");
            return false;
        };
        log::debug!("gpiochip phandle {phandle:#x}: pins {base}..{end}");
        self.chips.write().insert(phandle, GpioChip { base, ngpio });
        true
    }

    pub fn unregister(&self, phandle: u32) -> bool {
        self.chips.write().remove(&phandle).is_some()
    }

    pub fn resolve(&self, spec: GpioSpec) -> GpioLookup {
        let chips = self.chips.read();
        let Some(chip) = chips.get(&spec.phandle) else {
            return GpioLookup::Deferred;
        };
        if spec.offset >= chip.ngpio {
            log::warn!(
                "gpiochip phandle {:#x}: offset {} out of range ({} lines)",
                spec.phandle,
                spec.offset,
                chip.ngpio
            );
            return GpioLookup::NotFound;
        }
        match chip.base.checked_add(spec.offset) {
            Some(pin) => GpioLookup::Found(PinId::new(pin)),
            None => GpioLookup::NotFound,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    U32(u32),
    Gpios(Vec<GpioSpec>),
}

/// 内存中的设备树节点
pub struct PropertyNode<'a> {
    name: String,
    compatible: Vec<String>,
    props: BTreeMap<String, Property>,
    chips: &'a GpioChipRegistry,
}

impl<'a> PropertyNode<'a> {
    pub fn new(name: &str, chips: &'a GpioChipRegistry) -> Self {
        Self {
            name: name.to_string(),
            compatible: Vec::new(),
            props: BTreeMap::new(),
            chips,
        }
    }

    pub fn with_compatible(mut self, compatible: &str) -> Self {
        self.compatible.push(compatible.to_string());
        self
    }

    pub fn with_u32(mut self, name: &str, value: u32) -> Self {
        self.props.insert(name.to_string(), Property::U32(value));
        self
    }

    pub fn with_gpios(mut self, name: &str, gpios: &[GpioSpec]) -> Self {
        self.props
            .insert(name.to_string(), Property::Gpios(gpios.to_vec()));
        self
    }
}

impl OfNode for PropertyNode<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_compatible(&self, compatible: &str) -> bool {
        self.compatible.iter().any(|c| c == compatible)
    }

    fn named_gpio(&self, name: &str, index: usize) -> GpioLookup {
        match self.props.get(name) {
            Some(Property::Gpios(specs)) => match specs.get(index) {
                Some(spec) => self.chips.resolve(*spec),
                None => GpioLookup::NotFound,
            },
            Some(Property::U32(_)) => {
                log::warn!("{}: property {name} is not a GPIO list", self.name);
                GpioLookup::NotFound
            }
            None => GpioLookup::NotFound,
        }
    }

    fn read_u32(&self, name: &str) -> Option<u32> {
        match self.props.get(name)? {
            Property::U32(v) => Some(*v),
            Property::Gpios(_) => None,
        }
    }
}
