use crate::domain::ports::ModuleSource;
use crate::utils::error::{RealzError, Result};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 已登記於模組中的類別 (任意型別的共享實作)
#[derive(Clone)]
pub struct ClassRef {
    name: String,
    module: String,
    value: Arc<dyn Any + Send + Sync>,
}

impl ClassRef {
    pub fn new<T: Any + Send + Sync>(name: &str, module: &str, value: T) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            value: Arc::new(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 提供此類別的模組路徑
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| RealzError::ClassTypeMismatch {
                class_name: format!("{}.{}", self.module, self.name),
                expected: type_name::<T>(),
            })
    }

    /// 兩者是否為同一個類別物件
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}.{}'>", self.module, self.name)
    }
}

#[derive(Debug)]
pub struct Module {
    name: String,
    classes: BTreeMap<String, ClassRef>,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassRef> {
        self.classes.get(class_name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// 取得類別，找不到時回傳 `ClassNotFoundError`
    pub fn class(&self, class_name: &str) -> Result<ClassRef> {
        self.get(class_name)
            .cloned()
            .ok_or_else(|| RealzError::ClassNotFoundError {
                class_name: class_name.to_string(),
                searched: vec![self.name.clone()],
            })
    }
}

/// Collects the classes a module initializer defines.
pub struct ModuleBuilder<'a> {
    name: String,
    classes: BTreeMap<String, ClassRef>,
    source: &'a dyn ModuleSource,
}

impl<'a> ModuleBuilder<'a> {
    pub fn new(name: &str, source: &'a dyn ModuleSource) -> Self {
        Self {
            name: name.to_string(),
            classes: BTreeMap::new(),
            source,
        }
    }

    pub fn module_name(&self) -> &str {
        &self.name
    }

    /// 在模組中定義一個類別
    pub fn class<T: Any + Send + Sync>(&mut self, class_name: &str, value: T) -> &mut Self {
        let class = ClassRef::new(class_name, &self.name, value);
        self.classes.insert(class_name.to_string(), class);
        self
    }

    /// 重新匯出其他模組的類別 (保留原本的類別物件)
    pub fn reexport(&mut self, class: ClassRef) -> &mut Self {
        self.classes.insert(class.name().to_string(), class);
        self
    }

    /// 匯入另一個模組；不存在時回傳 `None`，初始化失敗則傳遞錯誤
    pub fn import(&self, path: &str) -> Result<Option<Arc<Module>>> {
        self.source.import_module(path).into_result()
    }

    /// 匯入必須存在的模組並取出類別
    pub fn require(&self, path: &str, class_name: &str) -> Result<ClassRef> {
        match self.import(path)? {
            Some(module) => module.class(class_name),
            None => Err(RealzError::ModuleResolutionError {
                label: path.to_string(),
            }),
        }
    }

    pub fn build(self) -> Module {
        Module {
            name: self.name,
            classes: self.classes,
        }
    }
}

/// 單次匯入嘗試的結果
#[derive(Debug)]
pub enum ImportOutcome {
    Found(Arc<Module>),
    NotFound,
    /// The module exists but its initializer failed.
    FailedDuringLoad(RealzError),
}

impl ImportOutcome {
    pub fn into_result(self) -> Result<Option<Arc<Module>>> {
        match self {
            ImportOutcome::Found(module) => Ok(Some(module)),
            ImportOutcome::NotFound => Ok(None),
            ImportOutcome::FailedDuringLoad(err) => Err(err),
        }
    }
}
